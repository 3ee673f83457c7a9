//! Grid locations and decal graphics.

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Loc {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Loc {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i64)]
pub enum GraphicElementType {
    None = 0,
    Line = 1,
    Arrow = 2,
    Box = 3,
    Circle = 4,
    Label = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i64)]
pub enum GraphicElementStyle {
    Grid = 0,
    Frame = 1,
    Hidden = 2,
    Inactive = 3,
    Active = 4,
}

/// One drawing primitive of a bel, wire or pip decal.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicElement {
    pub element_type: GraphicElementType,
    pub style: GraphicElementStyle,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub z: f32,
    pub text: String,
}

impl GraphicElement {
    pub fn new(
        element_type: GraphicElementType,
        style: GraphicElementStyle,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        z: f32,
    ) -> Self {
        Self {
            element_type,
            style,
            x1,
            y1,
            x2,
            y2,
            z,
            text: String::new(),
        }
    }
}

impl Default for GraphicElement {
    fn default() -> Self {
        Self::new(GraphicElementType::None, GraphicElementStyle::Frame, 0.0, 0.0, 0.0, 0.0, 0.0)
    }
}
