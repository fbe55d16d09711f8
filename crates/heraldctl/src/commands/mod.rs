pub mod health;
pub mod send;
pub mod subscriptions;
pub mod unsubscribe;
pub mod vapid;
