//! Frame statistics
//!
//! Counters are read back from the GPU on request only. A full span buffer
//! or node pool silently drops work during the frame; this is where that
//! becomes visible.

use super::gpu_types::{DrawArgs, OctreeCounters, SpanCounter};
use super::orchestrator_data::FrameOrchestrator;
use super::render_mode::RenderMode;
use super::scanline_operations::dropped_spans;
use crate::constants::octree::LEVEL_COUNT;
use crate::error::{ErrorContext, VisibilityResult};
use crate::gpu::read_buffer_words;
use std::collections::VecDeque;
use std::mem::size_of;
use std::time::{Duration, Instant};

/// Counters of the last frame recorded in `mode`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub mode: RenderMode,
    pub triangle_count: u32,

    pub span_count: u32,
    pub span_capacity: u32,
    pub spans_dropped: u32,

    pub octree_allocated: u32,
    pub octree_dropped: u32,
    pub octree_per_level: [u32; LEVEL_COUNT as usize],

    /// Triangles that survived the Hi-Z test
    pub emitted_triangles: u32,
}

impl FrameStats {
    pub fn culled_triangles(&self) -> u32 {
        self.triangle_count.saturating_sub(self.emitted_triangles)
    }
}

fn read_struct<T: bytemuck::Pod>(
    orchestrator: &FrameOrchestrator,
    buffer: &wgpu::Buffer,
    label: &str,
) -> VisibilityResult<T> {
    let words = read_buffer_words(
        &orchestrator.device,
        &orchestrator.queue,
        buffer,
        0,
        size_of::<T>() as u64,
        label,
    )?;
    decode_counters(&words, label)
}

fn decode_counters<T: bytemuck::Pod>(words: &[u32], label: &str) -> VisibilityResult<T> {
    bytemuck::try_pod_read_unaligned(bytemuck::cast_slice(words)).gpu_context(label)
}

/// Blocking readback of the counters `mode` writes. `None` without a mesh.
pub fn read_frame_stats(
    orchestrator: &FrameOrchestrator,
    mode: RenderMode,
) -> VisibilityResult<Option<FrameStats>> {
    let Some(mesh) = &orchestrator.mesh else {
        return Ok(None);
    };

    let mut stats = FrameStats {
        mode,
        triangle_count: mesh.sizing.triangle_count,
        span_capacity: mesh.spans.capacity,
        emitted_triangles: mesh.sizing.triangle_count,
        ..Default::default()
    };

    match mode {
        RenderMode::Scanline => {
            let counter: SpanCounter = read_struct(orchestrator, &mesh.spans.counter, "span counter")?;
            stats.span_count = counter.span_count;
            stats.spans_dropped = dropped_spans(&counter, mesh.spans.capacity);
            if stats.spans_dropped > 0 {
                log::warn!(
                    "[Scanline] Span buffer full: {} of {} spans dropped",
                    stats.spans_dropped,
                    stats.span_count
                );
            }
        }
        RenderMode::NaiveHiZ | RenderMode::OptimHiZ => {
            let args: DrawArgs = read_struct(orchestrator, &mesh.hiz.draw_args, "draw args")?;
            stats.emitted_triangles = args.vertex_count / 3;

            if mode == RenderMode::OptimHiZ {
                let counters: OctreeCounters =
                    read_struct(orchestrator, &mesh.octree.counters, "octree counters")?;
                stats.octree_allocated = counters.allocated.min(mesh.octree.pool_capacity);
                stats.octree_dropped = counters.dropped;
                stats.octree_per_level = counters.per_level;
                if counters.dropped > 0 {
                    log::warn!(
                        "[Octree] Node pool full: {} triangles dropped",
                        counters.dropped
                    );
                }
            }
        }
        RenderMode::Wireframe | RenderMode::NaiveZ => {}
    }

    Ok(Some(stats))
}

/// Rolling frame time over the last `window` frames
pub struct FrameTimer {
    window: usize,
    samples: VecDeque<Duration>,
    last_frame: Instant,
}

impl FrameTimer {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: VecDeque::with_capacity(window.max(1)),
            last_frame: Instant::now(),
        }
    }

    /// Mark the end of a frame
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.record(now - self.last_frame);
        self.last_frame = now;
    }

    pub fn record(&mut self, frame_time: Duration) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(frame_time);
    }

    pub fn average_frame_time(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }

    pub fn fps(&self) -> f32 {
        let average = self.average_frame_time().as_secs_f32();
        if average > 0.0 {
            1.0 / average
        } else {
            0.0
        }
    }
}
