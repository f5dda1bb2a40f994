pub mod competition;
pub mod config;
pub mod countdown;
pub mod demo_source;
pub mod feed;
pub mod http_client;
pub mod knockout;
pub mod resolver;
pub mod rotation;
pub mod scheduler;
pub mod state;
pub mod timing;
pub mod view;
