//! Whole-frame tests: scene graph, culling, queue sorting and the render
//! system working together

mod frame_pipeline;
