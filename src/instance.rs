//! Aggregate instances: a schema paired with the memory it describes.
//!
//! Cloning an [`Instance`] shares its memory; use [`Instance::duplicate`]
//! for an independent copy. Reading a nested aggregate field returns a
//! view onto the parent's memory, so writes through it are visible to the
//! parent.

use crate::error::{FfiError, FfiResult};
use crate::marshal::{decode_scalar, encode_scalar};
use crate::memory::{MemoryOwner, Storage};
use crate::schema::{FieldSchema, FieldType};
use crate::value::HostValue;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Instance {
    schema: Arc<FieldSchema>,
    storage: Storage,
    offset: usize,
}

impl Instance {
    /// Zero-filled instance in storage owned by the bridge.
    pub fn new(schema: Arc<FieldSchema>) -> Instance {
        let storage = Storage::owned(schema.total_size());
        Instance {
            schema,
            storage,
            offset: 0,
        }
    }

    /// Owned instance initialized from a byte image of exactly the schema size.
    pub fn from_bytes(schema: Arc<FieldSchema>, bytes: &[u8]) -> FfiResult<Instance> {
        if bytes.len() != schema.total_size() {
            return Err(FfiError::layout_mismatch(format!(
                "expected {} bytes, got {}",
                schema.total_size(),
                bytes.len()
            )));
        }
        Ok(Instance {
            schema,
            storage: Storage::from_vec(bytes.to_vec()),
            offset: 0,
        })
    }

    /// Owned copy of the bytes at `src`.
    ///
    /// # Safety
    /// `src` must point at `schema.total_size()` readable bytes.
    pub unsafe fn from_raw(schema: Arc<FieldSchema>, src: *const u8) -> Instance {
        let bytes = std::slice::from_raw_parts(src, schema.total_size()).to_vec();
        Instance {
            schema,
            storage: Storage::from_vec(bytes),
            offset: 0,
        }
    }

    /// Instance over externally managed memory.
    ///
    /// `declared_size`, when given, must equal the schema size.
    ///
    /// # Safety
    /// `address` must stay valid for `schema.total_size()` bytes of reads
    /// and writes until [`Instance::invalidate`] is called.
    pub unsafe fn external(
        schema: Arc<FieldSchema>,
        address: usize,
        declared_size: Option<usize>,
    ) -> FfiResult<Instance> {
        if address == 0 {
            return Err(FfiError::null_address("external struct memory"));
        }
        let size = schema.total_size();
        match declared_size {
            Some(0) => return Err(FfiError::invalid_spec("raw size cannot be zero")),
            Some(n) if n != size => {
                return Err(FfiError::invalid_spec(format!(
                    "raw size {} does not match struct size {}",
                    n, size
                )))
            }
            _ => {}
        }
        tracing::debug!(event = "external_imported", address, size);
        Ok(Instance {
            schema,
            storage: Storage::external(address, size),
            offset: 0,
        })
    }

    /// New owned instance with some fields set; the rest stay zero.
    pub fn with_values<V: HostValue>(
        schema: Arc<FieldSchema>,
        inits: &[(&str, V)],
    ) -> FfiResult<Instance> {
        let instance = Instance::new(schema);
        instance.apply(inits)?;
        Ok(instance)
    }

    /// Copy this instance, then set the given fields on the copy.
    pub fn make_similar<V: HostValue>(&self, inits: &[(&str, V)]) -> FfiResult<Instance> {
        let copy = self.duplicate()?;
        copy.apply(inits)?;
        Ok(copy)
    }

    fn apply<V: HostValue>(&self, inits: &[(&str, V)]) -> FfiResult<()> {
        for (name, value) in inits {
            self.set(name, value)?;
        }
        Ok(())
    }

    pub fn schema(&self) -> &Arc<FieldSchema> {
        &self.schema
    }

    pub fn size(&self) -> usize {
        self.schema.total_size()
    }

    pub fn owner(&self) -> MemoryOwner {
        self.storage.owner()
    }

    pub fn is_live(&self) -> bool {
        self.storage.is_live()
    }

    /// Size of the instance, checked for liveness.
    pub fn length(&self) -> FfiResult<usize> {
        self.storage.len()?;
        Ok(self.size())
    }

    /// Address of the first byte of this instance.
    pub fn address(&self) -> FfiResult<usize> {
        Ok(self.storage.address()? + self.offset)
    }

    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> FfiResult<R> {
        self.storage.with_bytes(self.offset, self.size(), f)
    }

    pub fn bytes(&self) -> FfiResult<Vec<u8>> {
        self.with_bytes(|b| b.to_vec())
    }

    /// Replace every byte of the instance.
    pub fn change(&self, bytes: &[u8]) -> FfiResult<()> {
        if bytes.len() != self.size() {
            return Err(FfiError::layout_mismatch(format!(
                "expected {} bytes, got {}",
                self.size(),
                bytes.len()
            )));
        }
        self.storage
            .with_bytes_mut(self.offset, bytes.len(), |d| d.copy_from_slice(bytes))
    }

    /// Independent owned copy sharing the schema.
    pub fn duplicate(&self) -> FfiResult<Instance> {
        Ok(Instance {
            schema: self.schema.clone(),
            storage: Storage::from_vec(self.bytes()?),
            offset: 0,
        })
    }

    /// Mark external memory as gone and optionally free it.
    ///
    /// Fails for bridge-owned memory and on a second call.
    pub fn invalidate(&self, free: Option<&dyn Fn(usize)>) -> FfiResult<()> {
        self.storage.invalidate(free)
    }

    fn lookup(&self, name: &str) -> FfiResult<&FieldSchema> {
        self.schema
            .field(name)
            .ok_or_else(|| FfiError::field_not_found(name))
    }

    fn element_offset(&self, field: &FieldSchema, index: usize) -> usize {
        self.offset + field.offset().unwrap_or(0) as usize + index * field.width()
    }

    /// Read a field. Arrays come back as lists.
    pub fn get<V: HostValue>(&self, name: &str) -> FfiResult<V> {
        let field = self.lookup(name)?;
        self.read_field(field)
    }

    /// Write a field. Arrays take a list of exactly `dimension` elements.
    ///
    /// Opaque fields store a value cell holding a clone of `value`; release
    /// it with [`crate::cell::free_value_pointer`] once the field is dead.
    pub fn set<V: HostValue>(&self, name: &str, value: &V) -> FfiResult<()> {
        let field = self.lookup(name)?;
        let mut bytes = Vec::with_capacity(field.total_size());
        match field.dimension() {
            None => encode_element(field, value, &mut bytes)?,
            Some(dim) => {
                let items = value.as_list().ok_or_else(|| {
                    FfiError::type_mismatch(format!("list of {}", dim), value.category().name())
                })?;
                if items.len() != dim as usize {
                    return Err(FfiError::type_mismatch(
                        format!("list of {} elements", dim),
                        format!("list of {}", items.len()),
                    )
                    .with_context(name));
                }
                for item in &items {
                    encode_element(field, item, &mut bytes)?;
                }
            }
        }
        let at = self.element_offset(field, 0);
        self.storage
            .with_bytes_mut(at, bytes.len(), |d| d.copy_from_slice(&bytes))
    }

    /// Read one element of an array field.
    pub fn get_element<V: HostValue>(&self, name: &str, index: usize) -> FfiResult<V> {
        let field = self.lookup(name)?;
        let dim = field.dimension().unwrap_or(1) as usize;
        if index >= dim {
            return Err(FfiError::index_out_of_bounds(index, dim));
        }
        self.read_element(field, index)
    }

    /// Write one element of an array field.
    pub fn set_element<V: HostValue>(&self, name: &str, index: usize, value: &V) -> FfiResult<()> {
        let field = self.lookup(name)?;
        let dim = field.dimension().unwrap_or(1) as usize;
        if index >= dim {
            return Err(FfiError::index_out_of_bounds(index, dim));
        }
        let mut bytes = Vec::with_capacity(field.width());
        encode_element(field, value, &mut bytes)?;
        let at = self.element_offset(field, index);
        self.storage
            .with_bytes_mut(at, bytes.len(), |d| d.copy_from_slice(&bytes))
    }

    /// Every field in declaration order with its current value.
    pub fn fields<V: HostValue>(&self) -> FfiResult<Vec<(Option<String>, V)>> {
        self.schema
            .fields()
            .iter()
            .map(|field| Ok((field.name().map(str::to_string), self.read_field(field)?)))
            .collect()
    }

    fn read_field<V: HostValue>(&self, field: &FieldSchema) -> FfiResult<V> {
        match field.dimension() {
            None => self.read_element(field, 0),
            Some(dim) => {
                let items = (0..dim as usize)
                    .map(|i| self.read_element(field, i))
                    .collect::<FfiResult<Vec<V>>>()?;
                Ok(V::list(items))
            }
        }
    }

    fn read_element<V: HostValue>(&self, field: &FieldSchema, index: usize) -> FfiResult<V> {
        let at = self.element_offset(field, index);
        match field.ty() {
            FieldType::Primitive(p) => self
                .storage
                .with_bytes(at, p.size(), |b| decode_scalar(*p, b))?,
            FieldType::Struct(_) => {
                self.storage.len()?;
                let schema = field
                    .element_schema()
                    .ok_or_else(|| FfiError::layout_mismatch("field is not an aggregate"))?;
                Ok(V::instance(Instance {
                    schema,
                    storage: self.storage.clone(),
                    offset: at,
                }))
            }
        }
    }

    /// Whether both instances view the same memory.
    pub fn shares_storage(&self, other: &Instance) -> bool {
        self.storage.same_storage(&other.storage)
    }
}

/// Append the bytes of one element of `field` holding `value`.
fn encode_element<V: HostValue>(
    field: &FieldSchema,
    value: &V,
    out: &mut Vec<u8>,
) -> FfiResult<()> {
    match field.ty() {
        FieldType::Primitive(p) => {
            let start = out.len();
            out.resize(start + p.size(), 0);
            encode_scalar(*p, value, &mut out[start..])
        }
        FieldType::Struct(layout) => {
            let src = value.as_instance().ok_or_else(|| {
                FfiError::type_mismatch("struct", value.category().name())
            })?;
            let compatible = src.size() == field.width()
                && src.schema().layout().is_some_and(|l| l.compatible(layout));
            if !compatible {
                return Err(FfiError::layout_mismatch(format!(
                    "cannot store {} in field of a different layout",
                    src.schema()
                )));
            }
            src.with_bytes(|b| out.extend_from_slice(b))
        }
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        if !self.schema.compatible(&other.schema) {
            return false;
        }
        match (self.bytes(), other.bytes()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bytes() {
            Ok(bytes) => write!(f, "#[{} {:02x?}]", self.schema, bytes),
            Err(_) => write!(f, "#[{} <invalidated>]", self.schema),
        }
    }
}
