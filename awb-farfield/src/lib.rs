#![warn(unused_qualifications)]

//! Far-field result massaging.
//!
//! Field solvers report far-field gain as a sparse table keyed by
//! `(frequency, phi, theta)`, with the angle axes delivered as rounded
//! textual labels (`"-180deg"`). This crate parses those labels, rebuilds
//! the dense `[theta][phi]` grid a surface plot needs, and projects it to
//! Cartesian coordinates.

pub mod angle;
pub mod grid;

pub use crate::{
    angle::{
        ParseAngleError,
        parse_angle_degrees,
    },
    grid::{
        CartesianSurface,
        EmptyResultError,
        FarFieldGrid,
        FarFieldSample,
        Tolerance,
        spherical_to_cartesian,
    },
};
