// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use ribbon_shaders::cpu::CpuBinding;
use ribbon_shaders::BindType;

use crate::low_level::{BufferProxy, Command, Recording, ResourceId, ResourceProxy, ShaderId};
use crate::{Error, Result};

pub enum CpuShaderType {
    Present(fn(u32, &[CpuBinding<'_>])),
    /// The stage exists but has no CPU implementation; dispatching it is an error.
    Missing,
}

struct Shader {
    label: &'static str,
    bindings: Vec<BindType>,
    cpu: CpuShaderType,
}

struct BindMapBuffer {
    buffer: RefCell<Vec<u8>>,
    label: &'static str,
}

#[derive(Default)]
struct BindMap {
    buf_map: HashMap<ResourceId, BindMapBuffer>,
}

#[derive(Hash, PartialEq, Eq)]
struct BufferProperties {
    size: u64,
    name: &'static str,
}

#[derive(Default)]
struct ResourcePool {
    bufs: HashMap<BufferProperties, Vec<Vec<u8>>>,
}

/// Buffers whose contents only live for one recording.
struct TransientBindMap<'a> {
    bufs: HashMap<ResourceId, &'a [u8]>,
}

/// Writes that are not yet ordered before later dispatches by a barrier.
#[derive(Default)]
struct HazardTracker {
    /// Buffer id to the label of the stage that wrote it.
    unsynchronized: HashMap<ResourceId, &'static str>,
}

/// Executes [`Recording`]s by running the CPU implementation of every stage.
///
/// Persistent buffers (the ones that are never uploaded) survive across recordings until
/// they are freed. Freed buffers go back to a pool keyed by size class and name.
#[derive(Default)]
pub struct CpuEngine {
    shaders: Vec<Shader>,
    pool: ResourcePool,
    bind_map: BindMap,
    downloads: HashMap<ResourceId, Vec<u8>>,
}

impl CpuEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shader.
    ///
    /// `layout` is the binding list of the stage; the engine uses it to know which
    /// bindings are written.
    pub fn add_compute_shader(
        &mut self,
        label: &'static str,
        layout: &[BindType],
        cpu_shader: CpuShaderType,
    ) -> ShaderId {
        let id = self.shaders.len();
        self.shaders.push(Shader {
            label,
            bindings: layout.to_vec(),
            cpu: cpu_shader,
        });
        ShaderId(id)
    }

    pub fn run_recording(&mut self, recording: &Recording, label: &'static str) -> Result<()> {
        let mut free_bufs: HashSet<ResourceId> = HashSet::default();
        let mut transient_map = TransientBindMap::new();
        let mut hazards = HazardTracker::default();
        log::trace!("running recording '{label}' ({} commands)", recording.commands.len());

        for command in &recording.commands {
            match command {
                Command::Upload(buf_proxy, bytes) | Command::UploadUniform(buf_proxy, bytes) => {
                    transient_map.bufs.insert(buf_proxy.id, bytes.as_slice());
                }
                Command::Dispatch(shader_id, (x, _, _), bindings) => {
                    let shader = &self.shaders[shader_id.0];
                    check_available(&free_bufs, bindings.iter().map(buf_of), "dispatch")?;
                    hazards.access(shader, bindings, None)?;
                    let cpu = select(shader)?;
                    log::trace!("dispatch {} ({x} workgroups)", shader.label);
                    let resources = transient_map.create_cpu_resources(
                        &mut self.bind_map,
                        &mut self.pool,
                        bindings,
                    );
                    cpu(*x, &resources);
                }
                Command::DispatchIndirect(shader_id, proxy, offset, bindings) => {
                    let shader = &self.shaders[shader_id.0];
                    check_available(
                        &free_bufs,
                        bindings.iter().map(buf_of).chain([proxy]),
                        "indirect dispatch",
                    )?;
                    hazards.access(shader, bindings, Some(proxy))?;
                    let cpu = select(shader)?;
                    let n_wg = transient_map.read_indirect(&self.bind_map, proxy, *offset)?;
                    log::trace!("dispatch_indirect {} ({n_wg} workgroups)", shader.label);
                    let resources = transient_map.create_cpu_resources(
                        &mut self.bind_map,
                        &mut self.pool,
                        bindings,
                    );
                    cpu(n_wg, &resources);
                }
                Command::Barrier(bufs) => {
                    for buf in bufs {
                        hazards.unsynchronized.remove(&buf.id);
                    }
                }
                Command::Download(proxy) => {
                    check_available(&free_bufs, [proxy], "download")?;
                    if hazards.unsynchronized.contains_key(&proxy.id) {
                        return Err(Error::UnsynchronizedAccess {
                            buffer: proxy.name,
                            shader: "download",
                        });
                    }
                    let bytes = transient_map
                        .with_bytes(&self.bind_map, proxy.id, |bytes| {
                            bytes[..(proxy.size as usize).min(bytes.len())].to_vec()
                        })
                        .ok_or(Error::UnavailableBufferUsed(proxy.name, "download"))?;
                    self.downloads.insert(proxy.id, bytes);
                }
                Command::Clear(proxy) => {
                    check_available(&free_bufs, [proxy], "clear")?;
                    self.bind_map.materialize_cpu_buf(proxy, &mut self.pool);
                    self.bind_map.buf_map[&proxy.id].buffer.borrow_mut().fill(0);
                }
                Command::FreeBuffer(proxy) => {
                    free_bufs.insert(proxy.id);
                }
            }
        }
        for id in free_bufs {
            if let Some(buf) = self.bind_map.buf_map.remove(&id) {
                let bytes = buf.buffer.into_inner();
                let props = BufferProperties {
                    size: bytes.len() as u64,
                    name: buf.label,
                };
                self.pool.bufs.entry(props).or_default().push(bytes);
            }
        }
        Ok(())
    }

    pub fn get_download(&self, buf: BufferProxy) -> Option<&[u8]> {
        self.downloads.get(&buf.id).map(Vec::as_slice)
    }

    pub fn free_download(&mut self, buf: BufferProxy) {
        self.downloads.remove(&buf.id);
    }

    /// Number of persistent buffers currently alive.
    pub fn live_buffers(&self) -> usize {
        self.bind_map.buf_map.len()
    }
}

fn buf_of(resource: &ResourceProxy) -> &BufferProxy {
    match resource {
        ResourceProxy::Buffer(proxy) => proxy,
    }
}

fn select(shader: &Shader) -> Result<fn(u32, &[CpuBinding<'_>])> {
    match shader.cpu {
        CpuShaderType::Present(f) => Ok(f),
        CpuShaderType::Missing => Err(Error::MissingShader(shader.label)),
    }
}

fn check_available<'a>(
    freed: &HashSet<ResourceId>,
    bufs: impl IntoIterator<Item = &'a BufferProxy>,
    usage: &'static str,
) -> Result<()> {
    for buf in bufs {
        if freed.contains(&buf.id) {
            return Err(Error::UnavailableBufferUsed(buf.name, usage));
        }
    }
    Ok(())
}

impl HazardTracker {
    /// Checks one dispatch against earlier writes, then records its own writes.
    fn access(
        &mut self,
        shader: &Shader,
        bindings: &[ResourceProxy],
        indirect: Option<&BufferProxy>,
    ) -> Result<()> {
        for buf in bindings.iter().map(buf_of).chain(indirect) {
            if self.unsynchronized.contains_key(&buf.id) {
                return Err(Error::UnsynchronizedAccess {
                    buffer: buf.name,
                    shader: shader.label,
                });
            }
        }
        debug_assert_eq!(bindings.len(), shader.bindings.len(), "{}", shader.label);
        for (binding, bind_type) in bindings.iter().zip(&shader.bindings) {
            if bind_type.is_mutable() {
                self.unsynchronized.insert(buf_of(binding).id, shader.label);
            }
        }
        Ok(())
    }
}

impl BindMap {
    /// Get a CPU buffer.
    ///
    /// Panics if buffer is not present.
    fn get_cpu_buf(&self, id: ResourceId) -> CpuBinding<'_> {
        CpuBinding::BufferRW(&self.buf_map[&id].buffer)
    }

    fn materialize_cpu_buf(&mut self, buf: &BufferProxy, pool: &mut ResourcePool) {
        self.buf_map.entry(buf.id).or_insert_with(|| BindMapBuffer {
            buffer: RefCell::new(pool.get_buf(buf.size, buf.name)),
            label: buf.name,
        });
    }
}

const SIZE_CLASS_BITS: u32 = 1;

impl ResourcePool {
    /// Get a zeroed buffer from the pool or create one.
    fn get_buf(&mut self, size: u64, name: &'static str) -> Vec<u8> {
        let rounded_size = Self::size_class(size, SIZE_CLASS_BITS);
        let props = BufferProperties {
            size: rounded_size,
            name,
        };
        if let Some(mut buf) = self.bufs.get_mut(&props).and_then(Vec::pop) {
            buf.fill(0);
            return buf;
        }
        vec![0; rounded_size as usize]
    }

    /// Quantize a size up to the nearest size class.
    fn size_class(x: u64, bits: u32) -> u64 {
        if x > 1 << bits {
            let a = (x - 1).leading_zeros();
            let b = (x - 1) | (((u64::MAX / 2) >> bits) >> a);
            b + 1
        } else {
            1 << bits
        }
    }
}

impl<'a> TransientBindMap<'a> {
    fn new() -> Self {
        TransientBindMap {
            bufs: HashMap::default(),
        }
    }

    /// Runs `f` on the current contents of a buffer, wherever it lives.
    fn with_bytes<R>(
        &self,
        bind_map: &BindMap,
        id: ResourceId,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Option<R> {
        if let Some(bytes) = self.bufs.get(&id) {
            return Some(f(bytes));
        }
        bind_map.buf_map.get(&id).map(|b| f(&b.buffer.borrow()))
    }

    fn read_indirect(&self, bind_map: &BindMap, proxy: &BufferProxy, offset: u64) -> Result<u32> {
        let start = offset as usize;
        let word = self
            .with_bytes(bind_map, proxy.id, |bytes| {
                bytes
                    .get(start..start + 4)
                    .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            })
            .ok_or(Error::UnavailableBufferUsed(proxy.name, "indirect dispatch"))?;
        word.ok_or(Error::IndirectArgsOutOfBounds(proxy.name))
    }

    fn create_cpu_resources<'b>(
        &'b self,
        bind_map: &'b mut BindMap,
        pool: &mut ResourcePool,
        bindings: &[ResourceProxy],
    ) -> Vec<CpuBinding<'b>> {
        // First pass is mutable; create buffers as needed
        for resource in bindings {
            let proxy = buf_of(resource);
            if !self.bufs.contains_key(&proxy.id) {
                bind_map.materialize_cpu_buf(proxy, pool);
            }
        }
        // Second pass takes immutable references
        let bind_map: &'b BindMap = bind_map;
        bindings
            .iter()
            .map(|resource| {
                let buf = buf_of(resource);
                match self.bufs.get(&buf.id) {
                    Some(b) => CpuBinding::Buffer(b),
                    None => bind_map.get_cpu_buf(buf.id),
                }
            })
            .collect()
    }
}
