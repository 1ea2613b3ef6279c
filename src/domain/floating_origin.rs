// Floating origin for a client's rendering frame.
//
// Invariant: true local position = rendered position + offset. A rebase moves value between the
// two terms, never changes the sum. The offset is node-local and never replicated.

use glam::DVec3;

#[derive(Debug, Clone, PartialEq)]
pub struct FloatingOrigin {
    offset: DVec3,
    threshold: f64,
    rebases: u64,
}

impl FloatingOrigin {
    pub fn new(threshold: f64) -> Self {
        Self {
            offset: DVec3::ZERO,
            threshold,
            rebases: 0,
        }
    }

    /// Accumulated offset, local units.
    pub fn offset(&self) -> DVec3 {
        self.offset
    }

    pub fn rebases(&self) -> u64 {
        self.rebases
    }

    pub fn to_rendered(&self, true_local: DVec3) -> DVec3 {
        true_local - self.offset
    }

    pub fn to_true(&self, rendered: DVec3) -> DVec3 {
        rendered + self.offset
    }

    /// Rebases when `focus` (a rendered position) is past the threshold: every rendered position
    /// in `rendered` is shifted by `-focus` and the shift is folded into the offset. Returns the
    /// applied shift.
    pub fn rebase_if_needed<'a>(
        &mut self,
        focus: DVec3,
        rendered: impl IntoIterator<Item = &'a mut DVec3>,
    ) -> Option<DVec3> {
        if focus.length() <= self.threshold {
            return None;
        }

        for position in rendered {
            *position -= focus;
        }
        self.offset += focus;
        self.rebases += 1;
        Some(focus)
    }
}
