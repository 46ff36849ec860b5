pub mod config;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod infra;
pub mod mode;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod services;
pub mod sync;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
