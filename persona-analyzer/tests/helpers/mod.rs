//! Shared test fixtures: deterministic fakes and a mock upstream server

#![allow(dead_code)]

pub mod fakes;
pub mod mock_upstream;
