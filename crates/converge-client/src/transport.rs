//! Frontera de transporte (spec.md §1, §9 "callback-shaped subscriptions"):
//! los transportes de wire concretos (WebSocket, canal en proceso, etc.) son
//! colaboradores externos. Modelado como un único sink registrado por lado en
//! vez de callbacks — `recv` es el único punto de suscripción del runtime.

use async_trait::async_trait;

use converge_core::wire::Envelope;

use crate::errors::TransportError;

#[async_trait]
pub trait Transport: Send {
    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn send(&mut self, envelope: Envelope) -> Result<(), TransportError>;

    /// Espera el próximo envelope entrante. `Ok(None)` señala un cierre
    /// limpio; `Err` una falla de transporte irrecuperable (dispara
    /// reconexión si está habilitada).
    async fn recv(&mut self) -> Result<Option<Envelope>, TransportError>;

    async fn close(&mut self);
}

/// Transporte en proceso sobre un par de canales — el análogo del binario de
/// demostración al cableado directo en memoria; también útil en tests que
/// necesitan los dos extremos de un pipe sin un socket real.
pub mod in_process {
    use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

    use super::*;

    pub struct InProcessTransport {
        outbound: UnboundedSender<Envelope>,
        inbound: UnboundedReceiver<Envelope>,
        connected: bool,
    }

    impl InProcessTransport {
        pub fn new(outbound: UnboundedSender<Envelope>, inbound: UnboundedReceiver<Envelope>) -> Self {
            Self { outbound, inbound, connected: false }
        }
    }

    #[async_trait]
    impl Transport for InProcessTransport {
        async fn connect(&mut self) -> Result<(), TransportError> {
            self.connected = true;
            Ok(())
        }

        async fn send(&mut self, envelope: Envelope) -> Result<(), TransportError> {
            if !self.connected {
                return Err(TransportError::Closed);
            }
            self.outbound.send(envelope).map_err(|_| TransportError::Closed)
        }

        async fn recv(&mut self) -> Result<Option<Envelope>, TransportError> {
            Ok(self.inbound.recv().await)
        }

        async fn close(&mut self) {
            self.connected = false;
        }
    }
}
