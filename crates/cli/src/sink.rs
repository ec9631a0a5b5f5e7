use refnet_model::{event::SinkError, EventSink, RewardEvent};

/// Sink that writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn deliver(&self, event: &RewardEvent) -> Result<(), SinkError> {
        match event {
            RewardEvent::Placed {
                member,
                sponsor,
                parent,
                position,
                level,
            } => {
                tracing::info!(%member, %sponsor, %parent, %position, level = *level, "placed");
            }
            RewardEvent::Credited {
                member,
                category,
                amount,
                level,
                locked,
                sequence,
            } => {
                tracing::info!(%member, %category, %amount, ?level, locked, sequence, "credited");
            }
            RewardEvent::Unlocked {
                member,
                previous_level,
                unlocked_level,
                released,
            } => {
                tracing::info!(%member, previous_level, unlocked_level, %released, "unlocked");
            }
        }
        Ok(())
    }
}
