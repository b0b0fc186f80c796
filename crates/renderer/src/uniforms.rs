use bytemuck::{Pod, Zeroable};

/// CPU mirror of the `Env` struct declared in the shader preamble.
///
/// The trailing padding rounds the block up to 16 bytes so it can be bound as
/// a uniform buffer on every backend.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UniformBlock {
    pub time: f32,
    pub width: f32,
    pub height: f32,
    _padding: f32,
}

impl UniformBlock {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(time: f32, width: f32, height: f32) -> Self {
        Self {
            time,
            width,
            height,
            _padding: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_preamble_fields() {
        let block = UniformBlock::new(1.5, 640.0, 480.0);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&block));
        assert_eq!(floats, &[1.5, 640.0, 480.0, 0.0]);
        assert_eq!(UniformBlock::SIZE, 16);
    }
}
