pub mod api;
pub mod bounties;
pub mod companion;
pub mod config;
pub mod credentials;
pub mod faction;
pub mod fairness;
pub mod format;
pub mod http_client;
pub mod json;
pub mod listing;
pub mod logging;
pub mod orchestrator;
pub mod player;
pub mod provider;
pub mod state;
pub mod stocks;
pub mod tabs;
pub mod ui;
pub mod war;
pub mod world_map;
