// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The command model of the compute path.
//!
//! A frame is recorded as a flat list of [`Command`]s over buffer handles and executed
//! later by [`CpuEngine`](crate::low_level::CpuEngine). Recording never touches memory;
//! buffers come into existence when the engine first sees their handle.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::Pod;

/// Index of a stage registered with the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ShaderId(pub usize);

/// Process unique identity of a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(pub NonZeroU64);

impl ResourceId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
    }
}

/// Handle to a buffer of `size` bytes. The name shows up in errors and logs.
#[derive(Clone, Copy, Debug)]
pub struct BufferProxy {
    pub size: u64,
    pub id: ResourceId,
    pub name: &'static str,
}

impl BufferProxy {
    pub fn new(size: u64, name: &'static str) -> Self {
        debug_assert!(size > 0, "buffer '{name}' is empty");
        Self {
            size,
            id: ResourceId::next(),
            name,
        }
    }
}

/// Anything a stage can bind.
#[derive(Clone, Copy, Debug)]
pub enum ResourceProxy {
    Buffer(BufferProxy),
}

impl From<BufferProxy> for ResourceProxy {
    fn from(value: BufferProxy) -> Self {
        Self::Buffer(value)
    }
}

#[derive(Debug)]
pub enum Command {
    Upload(BufferProxy, Vec<u8>),
    UploadUniform(BufferProxy, Vec<u8>),
    /// Zeroes the whole buffer.
    Clear(BufferProxy),
    /// Runs a stage over `x` workgroups. Bindings follow the stage's binding order.
    Dispatch(ShaderId, (u32, u32, u32), Vec<ResourceProxy>),
    /// Like [`Command::Dispatch`], with the workgroup count read from three words of
    /// the buffer at the byte offset when the command executes.
    DispatchIndirect(ShaderId, BufferProxy, u64, Vec<ResourceProxy>),
    /// Makes earlier writes to the listed buffers visible to later commands. Touching a
    /// written buffer without one is an error.
    Barrier(Vec<BufferProxy>),
    /// Copies the buffer out at this point of the recording.
    Download(BufferProxy),
    /// Returns the buffer to the engine once the recording finishes.
    FreeBuffer(BufferProxy),
}

/// Ordered commands for one run of the engine.
#[derive(Debug, Default)]
pub struct Recording {
    pub commands: Vec<Command>,
}

impl Recording {
    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Creates a buffer holding `data`.
    pub fn upload(&mut self, name: &'static str, data: impl Into<Vec<u8>>) -> BufferProxy {
        let data = data.into();
        let proxy = BufferProxy::new(data.len() as u64, name);
        self.push(Command::Upload(proxy, data));
        proxy
    }

    /// Creates a buffer holding the raw bytes of `values`.
    pub fn upload_slice<T: Pod>(&mut self, name: &'static str, values: &[T]) -> BufferProxy {
        self.upload(name, bytemuck::cast_slice::<T, u8>(values))
    }

    /// Creates a uniform buffer holding the raw bytes of `value`.
    pub fn upload_uniform<T: Pod>(&mut self, name: &'static str, value: &T) -> BufferProxy {
        let data = bytemuck::bytes_of(value).to_vec();
        let proxy = BufferProxy::new(data.len() as u64, name);
        self.push(Command::UploadUniform(proxy, data));
        proxy
    }

    pub fn dispatch<R>(&mut self, shader: ShaderId, workgroups: (u32, u32, u32), resources: R)
    where
        R: IntoIterator,
        R::Item: Into<ResourceProxy>,
    {
        let resources = resources.into_iter().map(Into::into).collect();
        self.push(Command::Dispatch(shader, workgroups, resources));
    }

    /// Dispatches with the workgroup count stored in `args` at byte `offset`, as written
    /// by an earlier stage.
    pub fn dispatch_indirect<R>(
        &mut self,
        shader: ShaderId,
        args: BufferProxy,
        offset: u64,
        resources: R,
    ) where
        R: IntoIterator,
        R::Item: Into<ResourceProxy>,
    {
        let resources = resources.into_iter().map(Into::into).collect();
        self.push(Command::DispatchIndirect(shader, args, offset, resources));
    }

    pub fn barrier(&mut self, bufs: impl IntoIterator<Item = BufferProxy>) {
        self.push(Command::Barrier(bufs.into_iter().collect()));
    }

    /// The copy is taken at this point, so the buffer may be freed right after.
    pub fn download(&mut self, buf: BufferProxy) {
        self.push(Command::Download(buf));
    }

    pub fn clear_all(&mut self, buf: BufferProxy) {
        self.push(Command::Clear(buf));
    }

    pub fn free_buffer(&mut self, buf: BufferProxy) {
        self.push(Command::FreeBuffer(buf));
    }

    pub fn free_buffers(&mut self, bufs: impl IntoIterator<Item = BufferProxy>) {
        for buf in bufs {
            self.free_buffer(buf);
        }
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_uploads_keep_byte_sizes() {
        let mut recording = Recording::default();
        let words = recording.upload_slice("words", &[1_u32, 2, 3]);
        let uniform = recording.upload_uniform("uniform", &[0.5_f32; 4]);
        assert_eq!(words.size, 12);
        assert_eq!(uniform.size, 16);
        assert_ne!(words.id, uniform.id);
        assert!(matches!(
            recording.commands[1],
            Command::UploadUniform(proxy, _) if proxy.id == uniform.id
        ));
    }

    #[test]
    fn free_buffers_keeps_order() {
        let mut recording = Recording::default();
        let a = BufferProxy::new(4, "a");
        let b = BufferProxy::new(4, "b");
        recording.free_buffers([a, b]);
        let freed: Vec<_> = recording
            .into_commands()
            .into_iter()
            .filter_map(|command| match command {
                Command::FreeBuffer(proxy) => Some(proxy.name),
                _ => None,
            })
            .collect();
        assert_eq!(freed, ["a", "b"]);
    }
}
