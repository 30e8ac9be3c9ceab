pub mod traffic_light_controller;

pub use traffic_light_controller::TrafficLightController;
