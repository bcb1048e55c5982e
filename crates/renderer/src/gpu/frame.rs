use std::time::Instant;

use crate::slot::ProgramSlot;

use super::context::GpuContext;
use super::program::Program;

/// Scissor rectangle `(x, y, width, height)` left inside a border of
/// `border` pixels, or `None` when nothing would remain.
pub(crate) fn inner_rect(width: u32, height: u32, border: u32) -> Option<(u32, u32, u32, u32)> {
    let inner_width = width.checked_sub(border * 2)?;
    let inner_height = height.checked_sub(border * 2)?;
    (inner_width > 0 && inner_height > 0).then_some((border, border, inner_width, inner_height))
}

/// Clears the frame to the indicator colour, then draws the active program
/// inside the border. Without a program the frame is cleared only.
pub(crate) fn render_frame(
    gpu: &GpuContext,
    slot: &mut ProgramSlot<Program>,
    mouse: [f32; 4],
    now: Instant,
) -> Result<(), wgpu::SurfaceError> {
    let sample = slot.sample(now);
    let indicator = slot.indicator();
    let (width, height) = (gpu.config.width, gpu.config.height);

    if let Some(program) = slot.active_mut() {
        let block = program.uniforms_mut();
        let data = block.data_mut();
        data.set_resolution(width as f32, height as f32);
        data.set_time(sample.seconds);
        data.set_mouse(mouse);
        block.upload(&gpu.queue);
    }

    let frame = gpu.surface.get_current_texture()?;
    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("gallery frame"),
        });

    {
        let [r, g, b, a] = indicator.border_color();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("gallery pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let inner = inner_rect(width, height, indicator.border_width());
        if let (Some(program), Some((x, y, w, h))) = (slot.active(), inner) {
            pass.set_scissor_rect(x, y, w, h);
            program.draw(&mut pass, &gpu.quad);
        }
    }

    gpu.queue.submit(Some(encoder.finish()));
    frame.present();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inset_by_border() {
        assert_eq!(inner_rect(800, 600, 1), Some((1, 1, 798, 598)));
        assert_eq!(inner_rect(800, 600, 2), Some((2, 2, 796, 596)));
    }

    #[test]
    fn tiny_surfaces_have_no_inner_rect() {
        assert_eq!(inner_rect(4, 600, 2), None);
        assert_eq!(inner_rect(1, 1, 1), None);
    }
}
