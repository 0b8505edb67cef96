pub mod auth;
pub mod backup;
pub mod calculator;
pub mod clock;
pub mod geo;
pub mod oauth;
pub mod perimeters;
pub mod policy;
pub mod report;
