pub mod api;
pub mod events;
pub mod models;
pub mod reactions;

pub use events::{GatewayCommand, GatewayEvent};
pub use models::{Author, ChannelId, ChannelMember, ChannelRole, Message, MessageId, MessagePatch, UserId};
pub use reactions::{Reaction, ReactionGroup, ReactionLedger, ToggleOutcome};
