//! converge-client: el runtime offline-first (spec.md §4.8, §4.10) construido
//! sobre el contrato `ClientStore` síncrono de `converge-core` — la
//! contraparte de cliente de `converge-server`, en espejo con la separación
//! entre un núcleo síncrono y el motor asíncrono construido encima.

pub mod config;
pub mod errors;
pub mod offline;
pub mod reconnect;
pub mod runtime;
pub mod transport;

pub use config::ClientConfig;
pub use runtime::ClientRuntime;
pub use transport::Transport;
