//! Broker acknowledgement policy per message outcome

use super::dispatcher::Disposition;
use crate::error::ErrorKind;

/// What the consumer tells the broker about a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    Ack,
    /// Negative-acknowledge and put the message back on the queue
    Requeue,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryPolicy {
    requeue_on_store_failure: bool,
}

impl DeliveryPolicy {
    pub fn new(requeue_on_store_failure: bool) -> Self {
        Self { requeue_on_store_failure }
    }

    /// Only store failures are ever retried, and only on first delivery.
    /// Bad input fails the same way every time, so it is always acked.
    pub fn decide(&self, disposition: Disposition, redelivered: bool) -> Acknowledgement {
        match disposition {
            Disposition::Dropped(ErrorKind::StoreFailure)
                if self.requeue_on_store_failure && !redelivered =>
            {
                Acknowledgement::Requeue
            }
            _ => Acknowledgement::Ack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatEventType;
    use uuid::Uuid;

    #[test]
    fn test_default_acks_everything() {
        let policy = DeliveryPolicy::default();
        let all = [
            Disposition::Stored(Uuid::nil()),
            Disposition::Duplicate,
            Disposition::Ignored(StatEventType::ObjectTracking),
            Disposition::Dropped(ErrorKind::Decode),
            Disposition::Dropped(ErrorKind::TypeMismatch),
            Disposition::Dropped(ErrorKind::MissingField),
            Disposition::Dropped(ErrorKind::StoreFailure),
        ];

        for disposition in all {
            assert_eq!(policy.decide(disposition, false), Acknowledgement::Ack);
        }
    }

    #[test]
    fn test_store_failure_requeued_once() {
        let policy = DeliveryPolicy::new(true);
        let failed = Disposition::Dropped(ErrorKind::StoreFailure);

        assert_eq!(policy.decide(failed, false), Acknowledgement::Requeue);
        assert_eq!(policy.decide(failed, true), Acknowledgement::Ack);
    }

    #[test]
    fn test_bad_input_never_requeued() {
        let policy = DeliveryPolicy::new(true);
        for kind in [ErrorKind::Decode, ErrorKind::TypeMismatch, ErrorKind::MissingField] {
            assert_eq!(policy.decide(Disposition::Dropped(kind), false), Acknowledgement::Ack);
        }
    }
}
