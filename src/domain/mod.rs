pub mod availability;
pub mod booking;
pub mod calendar;
pub mod discount;
pub mod pricing;
pub mod property;
pub mod report;
pub mod simulation;
