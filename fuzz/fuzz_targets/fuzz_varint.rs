#![no_main]

use libfuzzer_sys::fuzz_target;
use rankdex::utils::encoding::{encode_varint, read_varint_u32};

fuzz_target!(|data: &[u8]| {
    if let Ok((value, next)) = read_varint_u32(data, 0) {
        assert!(next <= data.len() && next <= 5);

        let mut encoded = Vec::new();
        encode_varint(value, &mut encoded);
        assert_eq!(read_varint_u32(&encoded, 0).ok(), Some((value, encoded.len())));
    }
});
