//! Decoder for the binary HPROF heap dump format.
//!
//! A dump is a header followed by tagged records. Strings, classes,
//! frames and stack traces are kept in lookup tables so later records
//! can refer to them; heap dump segments are walked only to total up
//! the bytes allocated under each stack trace serial.
//!
//! No forward references are allowed: any id that was not defined by an
//! earlier record aborts the decode. There is no partial-result recovery.

use super::reader::ByteReader;
use super::schema::{CallSite, Class, Frame, StackTrace, TraceSet};
use crate::utils::config::{
    HPROF_MAGIC, INSTANCE_HEADER_SIZE, OBJECT_ARRAY_HEADER_SIZE, PRIMITIVE_ARRAY_HEADER_SIZE,
    SUPPORTED_ID_SIZE, UNKNOWN_FILE,
};
use crate::utils::error::DecodeError;
use log::{debug, info, warn};
use num_enum::TryFromPrimitive;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

/// Top-level record tags the decoder interprets; all others are skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
enum RecordTag {
    Utf8String = 0x01,
    LoadClass = 0x02,
    StackFrame = 0x04,
    StackTrace = 0x05,
    HeapDumpSegment = 0x1C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
enum SubRecordTag {
    RootUnknown = 0xFF,
    JniGlobal = 0x01,
    JniLocal = 0x02,
    JavaFrame = 0x03,
    NativeStack = 0x04,
    StickyClass = 0x05,
    ThreadBlock = 0x06,
    MonitorUsed = 0x07,
    ThreadObject = 0x08,
    ClassDump = 0x20,
    InstanceDump = 0x21,
    ObjectArrayDump = 0x22,
    PrimitiveArrayDump = 0x23,
}

/// Field and array element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum BasicType {
    Object = 2,
    Boolean = 4,
    Char = 5,
    Float = 6,
    Double = 7,
    Byte = 8,
    Short = 9,
    Int = 10,
    Long = 11,
}

impl BasicType {
    /// Decode a type code, failing on anything outside the type table
    pub fn from_code(code: u8) -> Result<Self, DecodeError> {
        BasicType::try_from(code).map_err(|_| DecodeError::UnknownBasicType(code))
    }

    /// Width in bytes of one value of this type
    pub fn width(self, id_size: usize) -> u64 {
        match self {
            BasicType::Object => id_size as u64,
            BasicType::Boolean | BasicType::Byte => 1,
            BasicType::Char | BasicType::Short => 2,
            BasicType::Float | BasicType::Int => 4,
            BasicType::Double | BasicType::Long => 8,
        }
    }
}

/// Everything recovered from one binary dump
#[derive(Debug, Clone, Default)]
pub struct HeapProfile {
    pub id_size: usize,

    pub strings: HashMap<u64, String>,
    pub classes_by_id: HashMap<u64, Rc<Class>>,
    pub classes_by_serial: HashMap<u32, Rc<Class>>,
    pub frames: HashMap<u64, Rc<Frame>>,
    pub traces: BTreeMap<u32, StackTrace>,

    /// Estimated bytes of every object in every heap dump segment
    pub total_size: u64,
    pub instance_overhead: u64,
    pub object_array_overhead: u64,
    pub primitive_array_overhead: u64,

    /// Estimated bytes per allocating stack trace serial
    pub trace_sizes: HashMap<u32, u64>,

    /// How often each record tag and heap dump sub-tag occurred
    pub tag_counts: BTreeMap<u8, u64>,
    pub sub_tag_counts: BTreeMap<u8, u64>,
}

impl HeapProfile {
    /// Sum of the three header overhead counters
    pub fn total_overhead(&self) -> u64 {
        self.instance_overhead + self.object_array_overhead + self.primitive_array_overhead
    }

    /// Convert the decoded stack traces into call-site traces
    ///
    /// Each trace is weighted by the bytes allocated under its serial, so the
    /// resulting call graph shows where heap memory was allocated from.
    pub fn to_trace_set(&self) -> TraceSet {
        let mut set = TraceSet::new();
        for (&serial, trace) in &self.traces {
            let stack: Vec<CallSite> = trace.frames.iter().map(|f| f.to_call_site()).collect();
            let size = self.trace_sizes.get(&serial).copied().unwrap_or(0);
            set.insert_trace(serial, stack, size);
        }

        let unattributed: u64 = self
            .trace_sizes
            .iter()
            .filter(|(serial, _)| !self.traces.contains_key(*serial))
            .map(|(_, size)| size)
            .sum();
        if unattributed > 0 {
            debug!("{} bytes allocated under undefined stack trace serials", unattributed);
        }

        set
    }
}

/// Single-use decoder; its tables live exactly as long as one decode
pub struct HprofDecoder<R: Read> {
    reader: ByteReader<R>,
    profile: HeapProfile,
}

impl<R: Read> HprofDecoder<R> {
    pub fn new(input: R) -> Self {
        Self {
            reader: ByteReader::new(input),
            profile: HeapProfile::default(),
        }
    }

    /// Decode the whole stream
    ///
    /// # Errors
    /// The first structural problem (bad header, undefined reference,
    /// unknown sub-tag or type, truncation, segment length mismatch)
    /// ends the decode and is returned as-is.
    pub fn decode(mut self) -> Result<HeapProfile, DecodeError> {
        self.read_header()?;
        while self.read_record()? {}

        info!(
            "Decoded {} strings, {} classes, {} frames, {} stack traces ({} bytes of heap)",
            self.profile.strings.len(),
            self.profile.classes_by_id.len(),
            self.profile.frames.len(),
            self.profile.traces.len(),
            self.profile.total_size
        );

        Ok(self.profile)
    }

    fn read_header(&mut self) -> Result<(), DecodeError> {
        let magic = self.reader.nul_terminated()?;
        if magic != HPROF_MAGIC {
            return Err(DecodeError::BadMagic(
                String::from_utf8_lossy(&magic).into_owned(),
            ));
        }

        let id_size = self.reader.u4()?;
        if id_size != SUPPORTED_ID_SIZE {
            return Err(DecodeError::UnsupportedIdSize(id_size));
        }
        self.reader.set_id_size(id_size as usize);
        self.profile.id_size = id_size as usize;

        // Dump timestamp, high and low words
        self.reader.u4()?;
        self.reader.u4()?;
        Ok(())
    }

    /// Read one top-level record; `false` once the stream is exhausted
    fn read_record(&mut self) -> Result<bool, DecodeError> {
        let tag = match self.reader.try_u1()? {
            Some(tag) => tag,
            None => return Ok(false),
        };
        *self.profile.tag_counts.entry(tag).or_insert(0) += 1;

        self.reader.u4()?; // timestamp
        let length = self.reader.u4()?;
        let body_start = self.reader.offset();

        match RecordTag::try_from(tag) {
            Ok(RecordTag::Utf8String) => self.read_string(length)?,
            Ok(RecordTag::LoadClass) => self.read_class()?,
            Ok(RecordTag::StackFrame) => self.read_frame()?,
            Ok(RecordTag::StackTrace) => self.read_trace()?,
            Ok(RecordTag::HeapDumpSegment) => self.read_heap_dump_segment(length)?,
            Err(_) => {
                debug!("Skipping record tag {:#04x} ({} bytes)", tag, length);
                self.reader.skip(u64::from(length))?;
            }
        }

        let consumed = self.reader.offset() - body_start;
        if consumed != u64::from(length) {
            return Err(DecodeError::RecordLengthMismatch {
                tag,
                declared: length,
                consumed,
            });
        }
        Ok(true)
    }

    fn read_string(&mut self, length: u32) -> Result<(), DecodeError> {
        let text_len = (length as usize)
            .checked_sub(self.reader.id_size())
            .ok_or(DecodeError::RecordTooShort {
                tag: RecordTag::Utf8String as u8,
                length,
            })?;
        let id = self.reader.id()?;
        let text = String::from_utf8_lossy(&self.reader.bytes(text_len)?).into_owned();

        if self.profile.strings.contains_key(&id) {
            warn!("String id {} defined twice; keeping the first definition", id);
        } else {
            self.profile.strings.insert(id, text);
        }
        Ok(())
    }

    fn string(&self, id: u64, referrer: &'static str, what: &'static str) -> Result<String, DecodeError> {
        self.profile
            .strings
            .get(&id)
            .cloned()
            .ok_or(DecodeError::UndefinedString { referrer, what, id })
    }

    fn read_class(&mut self) -> Result<(), DecodeError> {
        let serial = self.reader.u4()?;
        let id = self.reader.id()?;
        let stack_trace_serial = self.reader.u4()?;
        let name_id = self.reader.id()?;
        let name = self.string(name_id, "class", "name")?;

        let class = Rc::new(Class {
            serial,
            id,
            stack_trace_serial,
            name,
        });
        self.profile.classes_by_id.insert(id, Rc::clone(&class));
        self.profile.classes_by_serial.insert(serial, class);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<(), DecodeError> {
        let id = self.reader.id()?;

        let method_name_id = self.reader.id()?;
        let method_name = self.string(method_name_id, "frame", "method name")?;

        let signature_id = self.reader.id()?;
        let method_signature = self.string(signature_id, "frame", "method signature")?;

        let filename_id = self.reader.id()?;
        let filename = if filename_id == 0 {
            UNKNOWN_FILE.to_string()
        } else {
            self.string(filename_id, "frame", "filename")?
        };

        let class_serial = self.reader.u4()?;
        let class = self
            .profile
            .classes_by_serial
            .get(&class_serial)
            .cloned()
            .ok_or(DecodeError::UndefinedClass(class_serial))?;

        // Signed on the wire: negative values mark unknown/compiled/native
        let line_number = self.reader.u4()? as i32;

        let frame = Frame {
            id,
            method_name,
            method_signature,
            filename,
            class,
            line_number,
        };
        self.profile.frames.insert(id, Rc::new(frame));
        Ok(())
    }

    fn read_trace(&mut self) -> Result<(), DecodeError> {
        let serial = self.reader.u4()?;
        let thread_serial = self.reader.u4()?;
        let frame_count = self.reader.u4()?;

        let mut frames = Vec::with_capacity(frame_count.min(1024) as usize);
        for _ in 0..frame_count {
            let frame_id = self.reader.id()?;
            let frame = self
                .profile
                .frames
                .get(&frame_id)
                .cloned()
                .ok_or(DecodeError::UndefinedFrame(frame_id))?;
            frames.push(frame);
        }

        if self.profile.traces.contains_key(&serial) {
            return Err(DecodeError::DuplicateTrace(serial));
        }
        self.profile.traces.insert(
            serial,
            StackTrace {
                serial,
                thread_serial,
                frames,
            },
        );
        Ok(())
    }

    fn read_heap_dump_segment(&mut self, length: u32) -> Result<(), DecodeError> {
        let declared = u64::from(length);
        let mut consumed = 0;
        while consumed < declared {
            consumed += self.read_sub_record()?;
        }
        if consumed != declared {
            return Err(DecodeError::SegmentLengthMismatch { declared, consumed });
        }
        Ok(())
    }

    fn basic_width(&self, code: u8) -> Result<u64, DecodeError> {
        Ok(BasicType::from_code(code)?.width(self.reader.id_size()))
    }

    /// Read one heap dump sub-record and return the bytes it occupied
    fn read_sub_record(&mut self) -> Result<u64, DecodeError> {
        let start = self.reader.offset();
        let sub_tag = self.reader.u1()?;
        *self.profile.sub_tag_counts.entry(sub_tag).or_insert(0) += 1;

        let kind = SubRecordTag::try_from(sub_tag).map_err(|_| DecodeError::UnknownSubTag(sub_tag))?;
        match kind {
            SubRecordTag::RootUnknown | SubRecordTag::StickyClass | SubRecordTag::MonitorUsed => {
                self.reader.id()?;
            }
            SubRecordTag::JniGlobal => {
                self.reader.id()?; // object id
                self.reader.id()?; // JNI global ref id
            }
            SubRecordTag::JniLocal | SubRecordTag::JavaFrame | SubRecordTag::ThreadObject => {
                self.reader.id()?;
                self.reader.u4()?;
                self.reader.u4()?;
            }
            SubRecordTag::NativeStack | SubRecordTag::ThreadBlock => {
                self.reader.id()?;
                self.reader.u4()?; // thread serial
            }
            SubRecordTag::ClassDump => self.read_class_dump()?,
            SubRecordTag::InstanceDump => {
                self.reader.id()?; // object id
                let trace_serial = self.reader.u4()?;
                self.reader.id()?; // class object id
                let field_bytes = u64::from(self.reader.u4()?);
                self.reader.skip(field_bytes)?;

                self.profile.instance_overhead += INSTANCE_HEADER_SIZE;
                self.add_allocation(trace_serial, field_bytes + INSTANCE_HEADER_SIZE);
            }
            SubRecordTag::ObjectArrayDump => {
                self.reader.id()?; // array object id
                let trace_serial = self.reader.u4()?;
                let elements = u64::from(self.reader.u4()?);
                self.reader.id()?; // array class object id
                let element_bytes = elements * self.reader.id_size() as u64;
                self.reader.skip(element_bytes)?;

                self.profile.object_array_overhead += OBJECT_ARRAY_HEADER_SIZE;
                self.add_allocation(trace_serial, element_bytes + OBJECT_ARRAY_HEADER_SIZE);
            }
            SubRecordTag::PrimitiveArrayDump => {
                self.reader.id()?; // array object id
                let trace_serial = self.reader.u4()?;
                let elements = u64::from(self.reader.u4()?);
                let element_type = self.reader.u1()?;
                let width = self.basic_width(element_type)?;
                let element_bytes = elements * width;
                self.reader.skip(element_bytes)?;

                self.profile.primitive_array_overhead += PRIMITIVE_ARRAY_HEADER_SIZE;
                self.add_allocation(trace_serial, element_bytes + PRIMITIVE_ARRAY_HEADER_SIZE);
            }
        }

        Ok(self.reader.offset() - start)
    }

    fn read_class_dump(&mut self) -> Result<(), DecodeError> {
        let class_object_id = self.reader.id()?;
        if !self.profile.classes_by_id.contains_key(&class_object_id) {
            return Err(DecodeError::UndefinedClassObject(class_object_id));
        }

        self.reader.u4()?; // stack trace serial
        self.reader.id()?; // super class object id
        self.reader.id()?; // class loader object id
        self.reader.id()?; // signers object id
        self.reader.id()?; // protection domain object id
        self.reader.id()?; // reserved
        self.reader.id()?; // reserved
        self.reader.u4()?; // instance size

        let constant_pool = self.reader.u2()?;
        for _ in 0..constant_pool {
            self.reader.u2()?; // constant pool index
            let value_type = self.reader.u1()?;
            let width = self.basic_width(value_type)?;
            self.reader.skip(width)?;
        }

        let static_fields = self.reader.u2()?;
        for _ in 0..static_fields {
            self.reader.id()?; // field name string id
            let value_type = self.reader.u1()?;
            let width = self.basic_width(value_type)?;
            self.reader.skip(width)?;
        }

        let instance_fields = self.reader.u2()?;
        for _ in 0..instance_fields {
            self.reader.id()?; // field name string id
            BasicType::from_code(self.reader.u1()?)?;
        }

        Ok(())
    }

    fn add_allocation(&mut self, trace_serial: u32, size: u64) {
        self.profile.total_size += size;
        *self.profile.trace_sizes.entry(trace_serial).or_insert(0) += size;
    }
}

/// Decode a binary dump from any byte stream
pub fn decode_heap_dump<R: Read>(input: R) -> Result<HeapProfile, DecodeError> {
    HprofDecoder::new(input).decode()
}

/// Decode a binary dump file
pub fn decode_heap_dump_file(path: impl AsRef<Path>) -> Result<HeapProfile, DecodeError> {
    let path = path.as_ref();
    debug!("Decoding binary dump: {}", path.display());
    let file = File::open(path)?;
    decode_heap_dump(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<u8> {
        let mut buf = HPROF_MAGIC.to_vec();
        buf.extend_from_slice(&8u32.to_be_bytes());
        buf.extend_from_slice(&[0; 8]);
        buf
    }

    fn record(buf: &mut Vec<u8>, tag: u8, body: &[u8]) {
        buf.push(tag);
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
        buf.extend_from_slice(body);
    }

    #[test]
    fn test_basic_type_widths() {
        assert_eq!(BasicType::from_code(2).unwrap().width(8), 8);
        assert_eq!(BasicType::from_code(4).unwrap().width(8), 1);
        assert_eq!(BasicType::from_code(5).unwrap().width(8), 2);
        assert_eq!(BasicType::from_code(7).unwrap().width(8), 8);
        assert_eq!(BasicType::from_code(10).unwrap().width(8), 4);
        assert!(matches!(BasicType::from_code(3), Err(DecodeError::UnknownBasicType(3))));
    }

    #[test]
    fn test_empty_dump() {
        let profile = decode_heap_dump(&header()[..]).unwrap();
        assert_eq!(profile.id_size, 8);
        assert!(profile.strings.is_empty());
        assert_eq!(profile.total_size, 0);
    }

    #[test]
    fn test_bad_magic() {
        let mut data = b"JAVA PROFILE 1.0.1\0".to_vec();
        data.extend_from_slice(&[0; 12]);
        assert!(matches!(decode_heap_dump(&data[..]), Err(DecodeError::BadMagic(_))));
    }

    #[test]
    fn test_unsupported_id_size() {
        let mut data = HPROF_MAGIC.to_vec();
        data.extend_from_slice(&4u32.to_be_bytes());
        data.extend_from_slice(&[0; 8]);
        assert!(matches!(
            decode_heap_dump(&data[..]),
            Err(DecodeError::UnsupportedIdSize(4))
        ));
    }

    #[test]
    fn test_unknown_record_is_skipped() {
        let mut data = header();
        record(&mut data, 0x0E, &[1, 2, 3, 4, 5, 6]);
        let mut body = 9u64.to_be_bytes().to_vec();
        body.extend_from_slice(b"hello");
        record(&mut data, 0x01, &body);

        let profile = decode_heap_dump(&data[..]).unwrap();
        assert_eq!(profile.strings.get(&9).map(String::as_str), Some("hello"));
        assert_eq!(profile.tag_counts.get(&0x0E), Some(&1));
    }
}
