//! Host-emulated queue.
//!
//! The queue executes recorded commands on the host copies of buffer and
//! image memory, then signals the submission's timeline semaphore. In
//! [`QueueMode::Immediate`] this happens during submit. In
//! [`QueueMode::Manual`] submissions wait until
//! [`process_pending`](DummyQueue::process_pending) runs, which lets callers
//! observe work that is still in flight.
//!
//! Dispatches and draws are not run. The queue resolves their arguments and
//! appends a record to a bounded log instead, see [`WORK_LOG_CAPACITY`].

use std::collections::VecDeque;
use std::sync::Arc;

use bytemuck::Pod;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::barriers::BarrierBatch;
use crate::rendering::{LoadOp, Scissor, StoreOp, Viewport};
use crate::resources::{BufferSlot, ImageSlot};
use crate::sync::TimelineSemaphore;
use crate::types::{DispatchIndirectArgs, DrawIndexedIndirectArgs, DrawIndirectArgs, Extent3d, IndexFormat};

/// Records kept per log until taken. Older records are dropped first.
pub const WORK_LOG_CAPACITY: usize = 256;

/// When submitted work executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueMode {
    /// Execute at submit time.
    #[default]
    Immediate,
    /// Execute on [`DummyQueue::process_pending`].
    Manual,
}

#[derive(Debug)]
pub(crate) struct AttachmentOp {
    pub(crate) image: Arc<ImageSlot>,
    pub(crate) load_op: LoadOp,
    pub(crate) store_op: StoreOp,
}

#[derive(Debug)]
pub(crate) enum DrawCommand {
    Direct(DrawIndirectArgs),
    Indexed {
        index_buffer: Arc<BufferSlot>,
        format: IndexFormat,
        args: DrawIndexedIndirectArgs,
    },
    Indirect {
        indirect: Arc<BufferSlot>,
    },
    IndexedIndirect {
        index_buffer: Arc<BufferSlot>,
        format: IndexFormat,
        indirect: Arc<BufferSlot>,
    },
}

/// A recorded command.
#[derive(Debug)]
pub(crate) enum Command {
    Barrier(BarrierBatch),
    CopyBuffer {
        src: Arc<BufferSlot>,
        dst: Arc<BufferSlot>,
    },
    CopyBufferRegion {
        src: Arc<BufferSlot>,
        src_offset: u64,
        dst: Arc<BufferSlot>,
        dst_offset: u64,
        size: u64,
    },
    CopyBufferToImage {
        src: Arc<BufferSlot>,
        dst: Arc<ImageSlot>,
    },
    CopyImageToBuffer {
        src: Arc<ImageSlot>,
        dst: Arc<BufferSlot>,
    },
    Dispatch {
        pipeline: String,
        group_counts: [u32; 3],
        param: Vec<u8>,
    },
    DispatchIndirect {
        pipeline: String,
        indirect: Arc<BufferSlot>,
        param: Vec<u8>,
    },
    BeginRendering {
        color: SmallVec<[AttachmentOp; 4]>,
        depth: Option<AttachmentOp>,
        extent: Extent3d,
    },
    SetViewport(Viewport),
    SetScissor(Scissor),
    Draw {
        pipeline: String,
        draw: DrawCommand,
        param: Vec<u8>,
    },
    EndRendering,
}

pub(crate) struct Submission {
    pub(crate) commands: Vec<Command>,
    pub(crate) semaphore: Arc<TimelineSemaphore>,
    pub(crate) value: u64,
}

/// A dispatch as executed by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub pipeline: String,
    /// Workgroup counts, read from the indirect buffer for indirect dispatches.
    pub group_counts: [u32; 3],
    pub param: Vec<u8>,
    pub indirect: bool,
}

/// A draw as executed by the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub pipeline: String,
    /// Vertices, or indices for indexed draws. Read from the indirect buffer
    /// for indirect draws.
    pub count: u32,
    pub instance_count: u32,
    pub indexed: bool,
    pub indirect: bool,
    pub viewport: Viewport,
    pub scissor: Scissor,
    pub param: Vec<u8>,
}

/// Counters of executed work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub submissions: u64,
    pub barrier_batches: u64,
    pub barriers: u64,
    pub copies: u64,
    pub dispatches: u64,
    pub render_passes: u64,
    pub draws: u64,
}

impl QueueStats {
    fn add(&mut self, other: &QueueStats) {
        self.submissions += other.submissions;
        self.barrier_batches += other.barrier_batches;
        self.barriers += other.barriers;
        self.copies += other.copies;
        self.dispatches += other.dispatches;
        self.render_passes += other.render_passes;
        self.draws += other.draws;
    }
}

#[derive(Debug)]
struct WorkLog<T> {
    entries: VecDeque<T>,
}

impl<T> WorkLog<T> {
    fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(WORK_LOG_CAPACITY),
        }
    }

    fn push(&mut self, entry: T) {
        if self.entries.len() == WORK_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    fn take(&mut self) -> Vec<T> {
        self.entries.drain(..).collect()
    }
}

/// Queue executing commands on host memory.
#[derive(Debug)]
pub struct DummyQueue {
    mode: QueueMode,
    pending: Mutex<VecDeque<Submission>>,
    stats: Mutex<QueueStats>,
    dispatch_log: Mutex<WorkLog<DispatchRecord>>,
    draw_log: Mutex<WorkLog<DrawRecord>>,
}

impl std::fmt::Debug for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submission")
            .field("commands", &self.commands.len())
            .field("semaphore", &self.semaphore.id())
            .field("value", &self.value)
            .finish()
    }
}

/// Viewport and scissor of the render pass being executed.
struct RenderState {
    viewport: Viewport,
    scissor: Scissor,
}

fn read_args<T: Pod>(slot: &BufferSlot) -> T {
    slot.with_memory(|memory| bytemuck::pod_read_unaligned(&memory[..std::mem::size_of::<T>()]))
}

impl DummyQueue {
    pub fn new(mode: QueueMode) -> Self {
        Self {
            mode,
            pending: Mutex::new(VecDeque::new()),
            stats: Mutex::new(QueueStats::default()),
            dispatch_log: Mutex::new(WorkLog::new()),
            draw_log: Mutex::new(WorkLog::new()),
        }
    }

    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    pub(crate) fn submit(&self, submission: Submission) {
        log::trace!(
            "DummyQueue: submit {} commands, signal semaphore {} to {}",
            submission.commands.len(),
            submission.semaphore.id(),
            submission.value
        );
        match self.mode {
            QueueMode::Immediate => {
                // Keep submission order even if a manual flush is running.
                let _order = self.pending.lock();
                self.execute(submission);
            }
            QueueMode::Manual => self.pending.lock().push_back(submission),
        }
    }

    /// Execute every waiting submission in order. Returns how many ran.
    pub fn process_pending(&self) -> usize {
        let mut pending = self.pending.lock();
        let count = pending.len();
        while let Some(submission) = pending.pop_front() {
            self.execute(submission);
        }
        count
    }

    /// Number of submissions waiting for [`process_pending`](Self::process_pending).
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn stats(&self) -> QueueStats {
        *self.stats.lock()
    }

    /// Remove and return the dispatches executed since the last call.
    pub fn take_dispatch_log(&self) -> Vec<DispatchRecord> {
        self.dispatch_log.lock().take()
    }

    /// Remove and return the draws executed since the last call.
    pub fn take_draw_log(&self) -> Vec<DrawRecord> {
        self.draw_log.lock().take()
    }

    fn execute(&self, submission: Submission) {
        let mut stats = QueueStats {
            submissions: 1,
            ..QueueStats::default()
        };
        let mut render_state: Option<RenderState> = None;
        for command in submission.commands {
            match command {
                Command::Barrier(batch) => {
                    stats.barrier_batches += 1;
                    stats.barriers += batch.len() as u64;
                }
                Command::CopyBuffer { src, dst } => {
                    stats.copies += 1;
                    let data = src.read();
                    if let Err(err) = dst.write(0, &data) {
                        log::error!("DummyQueue: buffer copy failed: {}", err);
                    }
                }
                Command::CopyBufferRegion {
                    src,
                    src_offset,
                    dst,
                    dst_offset,
                    size,
                } => {
                    stats.copies += 1;
                    let (start, end) = (src_offset as usize, (src_offset + size) as usize);
                    let data = src.with_memory(|memory| memory[start..end].to_vec());
                    if let Err(err) = dst.write(dst_offset, &data) {
                        log::error!("DummyQueue: buffer region copy failed: {}", err);
                    }
                }
                Command::CopyBufferToImage { src, dst } => {
                    stats.copies += 1;
                    let data = src.read();
                    dst.with_texels(|texels| {
                        let len = texels.len().min(data.len());
                        texels[..len].copy_from_slice(&data[..len]);
                    });
                }
                Command::CopyImageToBuffer { src, dst } => {
                    stats.copies += 1;
                    let texels = src.with_texels(|texels| texels.to_vec());
                    dst.with_memory(|memory| {
                        let len = memory.len().min(texels.len());
                        memory[..len].copy_from_slice(&texels[..len]);
                    });
                }
                Command::Dispatch {
                    pipeline,
                    group_counts,
                    param,
                } => {
                    stats.dispatches += 1;
                    self.dispatch_log.lock().push(DispatchRecord {
                        pipeline,
                        group_counts,
                        param,
                        indirect: false,
                    });
                }
                Command::DispatchIndirect {
                    pipeline,
                    indirect,
                    param,
                } => {
                    stats.dispatches += 1;
                    let args = read_args::<DispatchIndirectArgs>(&indirect);
                    self.dispatch_log.lock().push(DispatchRecord {
                        pipeline,
                        group_counts: [args.x, args.y, args.z],
                        param,
                        indirect: true,
                    });
                }
                Command::BeginRendering { color, depth, extent } => {
                    stats.render_passes += 1;
                    log::trace!(
                        "DummyQueue: begin rendering {}x{} into {} color attachments, depth {}",
                        extent.width,
                        extent.height,
                        color.len(),
                        depth.is_some()
                    );
                    render_state = Some(RenderState {
                        viewport: Viewport::from_extent(extent),
                        scissor: Scissor::from_extent(extent),
                    });
                }
                Command::SetViewport(viewport) => {
                    if let Some(state) = &mut render_state {
                        state.viewport = viewport;
                    }
                }
                Command::SetScissor(scissor) => {
                    if let Some(state) = &mut render_state {
                        state.scissor = scissor;
                    }
                }
                Command::Draw { pipeline, draw, param } => {
                    stats.draws += 1;
                    let Some(state) = &render_state else {
                        log::error!("DummyQueue: draw with \"{}\" outside of rendering", pipeline);
                        continue;
                    };
                    if let Some(record) = Self::resolve_draw(pipeline, draw, param, state) {
                        self.draw_log.lock().push(record);
                    }
                }
                Command::EndRendering => render_state = None,
            }
        }

        self.stats.lock().add(&stats);
        submission.semaphore.signal(submission.value);
    }

    fn resolve_draw(pipeline: String, draw: DrawCommand, param: Vec<u8>, state: &RenderState) -> Option<DrawRecord> {
        let (count, instance_count, indexed, indirect) = match draw {
            DrawCommand::Direct(args) => (args.vertex_count, args.instance_count, false, false),
            DrawCommand::Indexed { args, .. } => (args.index_count, args.instance_count, true, false),
            DrawCommand::Indirect { indirect } => {
                let args = read_args::<DrawIndirectArgs>(&indirect);
                (args.vertex_count, args.instance_count, false, true)
            }
            DrawCommand::IndexedIndirect {
                index_buffer,
                format,
                indirect,
            } => {
                let args = read_args::<DrawIndexedIndirectArgs>(&indirect);
                let end = (args.first_index as u64 + args.index_count as u64) * format.bytes();
                if end > index_buffer.size {
                    log::error!(
                        "DummyQueue: indirect draw with \"{}\" reads past index buffer \"{}\"",
                        pipeline,
                        index_buffer.name
                    );
                    return None;
                }
                (args.index_count, args.instance_count, true, true)
            }
        };
        Some(DrawRecord {
            pipeline,
            count,
            instance_count,
            indexed,
            indirect,
            viewport: state.viewport,
            scissor: state.scissor,
            param,
        })
    }
}
