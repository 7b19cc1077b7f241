pub mod answer;
pub mod attempt;
pub mod batch;
pub mod question;
pub mod quiz;
