//! Builders for small binary HPROF dumps used across integration tests.

#![allow(dead_code)]

pub const MAGIC: &[u8] = b"JAVA PROFILE 1.0.2\0";

pub const TAG_STRING: u8 = 0x01;
pub const TAG_LOAD_CLASS: u8 = 0x02;
pub const TAG_STACK_FRAME: u8 = 0x04;
pub const TAG_STACK_TRACE: u8 = 0x05;
pub const TAG_HEAP_DUMP_SEGMENT: u8 = 0x1C;

/// Appends records to a dump that starts with a valid 8-byte-id header
pub struct DumpBuilder {
    buf: Vec<u8>,
}

impl DumpBuilder {
    pub fn new() -> Self {
        let mut buf = MAGIC.to_vec();
        buf.extend_from_slice(&8u32.to_be_bytes());
        buf.extend_from_slice(&[0; 8]);
        Self { buf }
    }

    /// Record whose declared length may differ from the body actually written
    pub fn raw_record(mut self, tag: u8, declared_len: u32, body: &[u8]) -> Self {
        self.buf.push(tag);
        self.buf.extend_from_slice(&0u32.to_be_bytes());
        self.buf.extend_from_slice(&declared_len.to_be_bytes());
        self.buf.extend_from_slice(body);
        self
    }

    pub fn record(self, tag: u8, body: &[u8]) -> Self {
        let len = body.len() as u32;
        self.raw_record(tag, len, body)
    }

    pub fn string(self, id: u64, text: &str) -> Self {
        let mut body = id.to_be_bytes().to_vec();
        body.extend_from_slice(text.as_bytes());
        self.record(TAG_STRING, &body)
    }

    pub fn load_class(self, serial: u32, id: u64, name_id: u64) -> Self {
        let mut body = serial.to_be_bytes().to_vec();
        body.extend_from_slice(&id.to_be_bytes());
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&name_id.to_be_bytes());
        self.record(TAG_LOAD_CLASS, &body)
    }

    pub fn frame(
        self,
        id: u64,
        method_id: u64,
        signature_id: u64,
        file_id: u64,
        class_serial: u32,
        line: i32,
    ) -> Self {
        let mut body = Vec::new();
        for value in [id, method_id, signature_id, file_id] {
            body.extend_from_slice(&value.to_be_bytes());
        }
        body.extend_from_slice(&class_serial.to_be_bytes());
        body.extend_from_slice(&line.to_be_bytes());
        self.record(TAG_STACK_FRAME, &body)
    }

    pub fn trace(self, serial: u32, frame_ids: &[u64]) -> Self {
        let mut body = serial.to_be_bytes().to_vec();
        body.extend_from_slice(&1u32.to_be_bytes());
        body.extend_from_slice(&(frame_ids.len() as u32).to_be_bytes());
        for id in frame_ids {
            body.extend_from_slice(&id.to_be_bytes());
        }
        self.record(TAG_STACK_TRACE, &body)
    }

    pub fn segment(self, sub_records: &[Vec<u8>]) -> Self {
        let body = sub_records.concat();
        self.record(TAG_HEAP_DUMP_SEGMENT, &body)
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

pub fn root_unknown(object_id: u64) -> Vec<u8> {
    let mut sub = vec![0xFF];
    sub.extend_from_slice(&object_id.to_be_bytes());
    sub
}

pub fn instance_dump(object_id: u64, trace_serial: u32, class_id: u64, field_bytes: usize) -> Vec<u8> {
    let mut sub = vec![0x21];
    sub.extend_from_slice(&object_id.to_be_bytes());
    sub.extend_from_slice(&trace_serial.to_be_bytes());
    sub.extend_from_slice(&class_id.to_be_bytes());
    sub.extend_from_slice(&(field_bytes as u32).to_be_bytes());
    sub.extend(std::iter::repeat(0u8).take(field_bytes));
    sub
}

pub fn object_array_dump(array_id: u64, trace_serial: u32, elements: usize) -> Vec<u8> {
    let mut sub = vec![0x22];
    sub.extend_from_slice(&array_id.to_be_bytes());
    sub.extend_from_slice(&trace_serial.to_be_bytes());
    sub.extend_from_slice(&(elements as u32).to_be_bytes());
    sub.extend_from_slice(&0u64.to_be_bytes());
    sub.extend(std::iter::repeat(0u8).take(elements * 8));
    sub
}

/// Primitive array of `int` elements
pub fn int_array_dump(array_id: u64, trace_serial: u32, elements: usize) -> Vec<u8> {
    let mut sub = vec![0x23];
    sub.extend_from_slice(&array_id.to_be_bytes());
    sub.extend_from_slice(&trace_serial.to_be_bytes());
    sub.extend_from_slice(&(elements as u32).to_be_bytes());
    sub.push(10);
    sub.extend(std::iter::repeat(0u8).take(elements * 4));
    sub
}

/// CLASS DUMP with one int constant, one object static and one instance field
pub fn class_dump(class_id: u64) -> Vec<u8> {
    let mut sub = vec![0x20];
    sub.extend_from_slice(&class_id.to_be_bytes());
    sub.extend_from_slice(&0u32.to_be_bytes());
    sub.extend(std::iter::repeat(0u8).take(6 * 8));
    sub.extend_from_slice(&16u32.to_be_bytes());

    sub.extend_from_slice(&1u16.to_be_bytes());
    sub.extend_from_slice(&3u16.to_be_bytes());
    sub.push(10);
    sub.extend_from_slice(&7u32.to_be_bytes());

    sub.extend_from_slice(&1u16.to_be_bytes());
    sub.extend_from_slice(&1u64.to_be_bytes());
    sub.push(2);
    sub.extend_from_slice(&0u64.to_be_bytes());

    sub.extend_from_slice(&1u16.to_be_bytes());
    sub.extend_from_slice(&1u64.to_be_bytes());
    sub.push(11);
    sub
}

/// One class `com/example/Foo` with method `run` called from `main`;
/// trace 7 allocates a 24-byte instance, trace 8 an int array.
pub fn allocation_dump() -> Vec<u8> {
    DumpBuilder::new()
        .string(1, "com/example/Foo")
        .string(2, "run")
        .string(3, "()V")
        .string(4, "Foo.java")
        .string(5, "main")
        .load_class(1, 100, 1)
        .frame(10, 2, 3, 4, 1, 42)
        .frame(11, 5, 3, 4, 1, 7)
        .trace(7, &[10, 11])
        .trace(8, &[11])
        .segment(&[
            root_unknown(500),
            class_dump(100),
            instance_dump(501, 7, 100, 8),
            int_array_dump(502, 8, 4),
        ])
        .build()
}
