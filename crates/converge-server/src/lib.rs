//! converge-server: la máquina de estados de sesión asíncrona por conexión
//! y el pipeline de submit/sync (spec.md §4.5–§4.9). Construida sobre los
//! contratos de store síncronos de `converge-core`, igual que un motor de
//! flujos asíncrono se construye sobre la maquinaria de event-sourcing
//! síncrona que le sirve de base.

pub mod broadcast;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod limits;
pub mod session;

pub use broadcast::SessionRegistry;
pub use config::ServerConfig;
pub use session::{ServerSession, SystemClock};
