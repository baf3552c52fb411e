use crate::models::notification::{Notification, NotificationId};

/// User-visible notification surface (toasts, banners).
pub trait NotificationSink: Send + Sync {
    fn raise(&self, notification: &Notification);

    fn dismiss(&self, id: NotificationId);
}
