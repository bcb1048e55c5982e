use crate::compile::UniformHandles;

/// CPU shadow of a program's uniform block, written through reflected offsets.
#[derive(Debug, Clone)]
pub(crate) struct UniformData {
    handles: UniformHandles,
    bytes: Vec<u8>,
}

impl UniformData {
    pub fn new(handles: UniformHandles) -> Self {
        // Uniform buffer bindings must be at least 16 bytes and 16-byte sized.
        let size = (handles.block_size.max(16) as usize).next_multiple_of(16);
        Self {
            handles,
            bytes: vec![0; size],
        }
    }

    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.write(self.handles.resolution, &[width, height]);
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.write(self.handles.time, &[seconds]);
    }

    pub fn set_mouse(&mut self, mouse: [f32; 4]) {
        self.write(self.handles.mouse, &mouse);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn write(&mut self, offset: Option<u32>, values: &[f32]) {
        let Some(offset) = offset else {
            return;
        };
        let data: &[u8] = bytemuck::cast_slice(values);
        let start = offset as usize;
        let end = start + data.len();
        if let Some(target) = self.bytes.get_mut(start..end) {
            target.copy_from_slice(data);
        }
    }
}

/// Uniform block of one program: shadow data plus the GPU buffer it mirrors.
pub(crate) struct UniformBlock {
    data: UniformData,
    buffer: wgpu::Buffer,
}

impl UniformBlock {
    pub fn new(device: &wgpu::Device, handles: UniformHandles) -> Self {
        let data = UniformData::new(handles);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gallery uniforms"),
            size: data.as_bytes().len() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { data, buffer }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn data_mut(&mut self) -> &mut UniformData {
        &mut self.data
    }

    pub fn upload(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, self.data.as_bytes());
    }
}
