//! Request channel to the deterministic simulation collaborator

use std::sync::mpsc;

use riposte_shared::SimRequest;

/// Ordered, fire-and-forget channel to the simulation collaborator
///
/// Requests must reach the collaborator in submission order: a `Save` for a
/// frame always precedes the `Step` for that frame, and a `Load` follows every
/// `Save` it may refer to. Implementations must not block the caller.
/// Replies to `Save` come back as `Command::Saved` through a
/// [`SessionHandle`](crate::rollback::SessionHandle).
pub trait SimulationPort: Send {
    fn submit(&mut self, request: SimRequest);
}

impl SimulationPort for mpsc::Sender<SimRequest> {
    fn submit(&mut self, request: SimRequest) {
        if let Err(e) = self.send(request) {
            tracing::warn!(frame = e.0.frame(), "Simulation collaborator hung up");
        }
    }
}

impl<P: SimulationPort + ?Sized> SimulationPort for Box<P> {
    fn submit(&mut self, request: SimRequest) {
        (**self).submit(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_port_preserves_order() {
        let (mut tx, rx) = mpsc::channel();
        tx.submit(SimRequest::Save { frame: 0 });
        tx.submit(SimRequest::Load {
            frame: 0,
            state: None,
        });
        let frames: Vec<_> = rx.try_iter().map(|r| r.frame()).collect();
        assert_eq!(frames, vec![0, 0]);
    }

    #[test]
    fn test_channel_port_survives_hangup() {
        let (mut tx, rx) = mpsc::channel::<SimRequest>();
        drop(rx);
        tx.submit(SimRequest::Save { frame: 1 });
    }
}
