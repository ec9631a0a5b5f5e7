use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;

use crate::{
    action::{DistributionReport, EnrollmentReport, ReferralReport},
    ledger::Category,
    member::{MemberId, Position},
    tree::Placement,
};

/// Domain event emitted after a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum RewardEvent {
    /// A member was placed in the tree.
    Placed {
        /// The placed member.
        member: MemberId,
        /// Who introduced the member.
        sponsor: MemberId,
        /// Structural parent.
        parent: MemberId,
        /// Slot under the parent.
        position: Position,
        /// Level below the sponsor.
        level: u8,
    },
    /// Points were credited.
    Credited {
        /// The credited member.
        member: MemberId,
        /// Category of the credit.
        category: Category,
        /// Credited amount.
        amount: Decimal,
        /// Community level, if any.
        level: Option<u8>,
        /// Whether the amount is locked.
        locked: bool,
        /// Ledger sequence number.
        sequence: u64,
    },
    /// Locked levels were released.
    Unlocked {
        /// The member.
        member: MemberId,
        /// Unlocked level before the release.
        previous_level: u8,
        /// Unlocked level after the release.
        unlocked_level: u8,
        /// Released amount.
        released: Decimal,
    },
}

impl RewardEvent {
    /// Get the member the event is about.
    pub fn member(&self) -> MemberId {
        match self {
            Self::Placed { member, .. }
            | Self::Credited { member, .. }
            | Self::Unlocked { member, .. } => *member,
        }
    }
}

/// Reports that produce events.
pub trait EventSource {
    /// Push the events of this report into `events`, in occurrence order.
    fn collect_events(&self, events: &mut Vec<RewardEvent>);

    /// Get the events of this report.
    fn events(&self) -> Vec<RewardEvent> {
        let mut events = Vec::new();
        self.collect_events(&mut events);
        events
    }
}

impl EventSource for Placement {
    fn collect_events(&self, events: &mut Vec<RewardEvent>) {
        let edge = self.edge();
        events.push(RewardEvent::Placed {
            member: edge.child,
            sponsor: edge.sponsor,
            parent: edge.parent,
            position: edge.position,
            level: self.level(),
        });
    }
}

impl EventSource for ReferralReport {
    fn collect_events(&self, events: &mut Vec<RewardEvent>) {
        if let Some(unlock) = self.unlock() {
            events.push(RewardEvent::Unlocked {
                member: self.member(),
                previous_level: unlock.previous_level,
                unlocked_level: unlock.unlocked_level,
                released: unlock.released,
            });
        }
    }
}

impl EventSource for DistributionReport {
    fn collect_events(&self, events: &mut Vec<RewardEvent>) {
        events.extend(self.credits().iter().map(|credit| RewardEvent::Credited {
            member: credit.member,
            category: Category::Community,
            amount: credit.amount,
            level: Some(credit.level),
            locked: credit.locked,
            sequence: credit.sequence,
        }));
    }
}

impl EventSource for EnrollmentReport {
    fn collect_events(&self, events: &mut Vec<RewardEvent>) {
        self.placement().collect_events(events);
        self.referral().collect_events(events);
        let mut credits = self
            .direct_credits()
            .map(|credit| RewardEvent::Credited {
                member: credit.member,
                category: credit.category,
                amount: credit.amount,
                level: None,
                locked: false,
                sequence: credit.sequence,
            })
            .collect::<Vec<_>>();
        self.distribution().collect_events(&mut credits);
        credits.sort_by_key(|event| match event {
            RewardEvent::Credited { sequence, .. } => *sequence,
            _ => u64::MAX,
        });
        events.extend(credits);
    }
}

/// Error returned by an [`EventSink`].
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Subscriber to committed events.
///
/// A failing sink never affects the outcome of the operation that produced the events.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn deliver(&self, event: &RewardEvent) -> Result<(), SinkError>;
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn deliver(&self, event: &RewardEvent) -> Result<(), SinkError> {
        (**self).deliver(event)
    }
}

/// A sink recording every delivered event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<RewardEvent>>>,
}

impl RecordingSink {
    /// Get a copy of the recorded events.
    pub fn events(&self) -> Vec<RewardEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Take the recorded events, leaving the sink empty.
    pub fn take(&self) -> Vec<RewardEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl EventSink for RecordingSink {
    fn deliver(&self, event: &RewardEvent) -> Result<(), SinkError> {
        self.events
            .lock()
            .map_err(|_| "recording sink poisoned")?
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::{
        action::{Enroll, NetworkAction},
        params::Params,
        test::{chain, TestStore},
    };

    use super::*;

    #[test]
    fn enrollment_events_are_ordered() -> crate::Result<()> {
        let mut store = TestStore::default();
        let members = chain(&mut store, 2)?;
        let params = Params::default();
        let report = Enroll::try_new(&mut store, &params, members[1], MemberId(3), dec!(100), None)?
            .execute()?;

        let events = report.events();
        assert!(matches!(
            events[0],
            RewardEvent::Placed { member: MemberId(3), level: 1, .. }
        ));
        assert!(matches!(
            events[1],
            RewardEvent::Unlocked { previous_level: 5, unlocked_level: 10, .. }
        ));
        let sequences = events[2..]
            .iter()
            .map(|event| match event {
                RewardEvent::Credited { sequence, .. } => *sequence,
                other => panic!("unexpected event: {other:?}"),
            })
            .collect::<Vec<_>>();
        // Personal, referral and two community credits.
        assert_eq!(sequences.len(), 4);
        assert!(sequences.windows(2).all(|w| w[0] < w[1]));
        Ok(())
    }

    #[test]
    fn recording_sink_collects_and_drains() -> Result<(), SinkError> {
        let sink = RecordingSink::default();
        let event = RewardEvent::Unlocked {
            member: MemberId(1),
            previous_level: 5,
            unlocked_level: 10,
            released: dec!(3),
        };
        sink.deliver(&event)?;
        sink.clone().deliver(&event)?;
        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.take(), vec![event.clone(), event]);
        assert!(sink.events().is_empty());
        Ok(())
    }
}
