pub mod answer;
pub mod candidate;
