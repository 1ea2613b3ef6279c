// Interface adapters: wire protocol, authority service and network handling.

pub mod authority;
pub mod http;
pub mod net;
pub mod protocol;
pub mod query;
pub mod state;
pub mod utils;
