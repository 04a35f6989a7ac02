mod alert_port;
mod broadcast_port;
mod notification_api_port;

pub use alert_port::AlertPort;
pub use broadcast_port::{BroadcastEvent, BroadcastPort, PushEvent};
pub use notification_api_port::{ChannelAuthPort, NotificationApiPort};
