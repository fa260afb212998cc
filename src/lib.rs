extern crate nalgebra as na;

pub mod checkpoint;
pub mod config;
pub mod controller;
pub mod cost;
pub mod dynamics;
pub mod errors;
pub mod gateway;
pub mod mppi;
pub mod sim;
pub mod telemetry;
pub mod tick;

/// State vector: [market_tick, pool_tick, center_tick, half_width]
pub type State = na::Vector4<f64>;

/// Control vector: [d_center, d_half_width]
pub type Control = na::Vector2<f64>;
