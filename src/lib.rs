//! City Paths Library
//!
//! Path building and path following for vehicles and pedestrians moving
//! between buildings, roads and junctions of a city map.

pub mod simulation;
