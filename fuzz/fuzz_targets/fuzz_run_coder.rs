#![no_main]

use arbitrary::Arbitrary;
use dynbwt::utils::{decode_varint, RunCoder};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    outdegree: u16,
    data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    // Decoding arbitrary bytes must stop cleanly at the end of the buffer
    let coder = RunCoder::new(input.outdegree as usize);
    let mut offset = 0;
    while offset < input.data.len() {
        let before = offset;
        if coder.read(&input.data, &mut offset).is_none() {
            break;
        }
        assert!(offset > before && offset <= input.data.len());
    }

    let mut offset = 0;
    while decode_varint(&input.data, &mut offset).is_some() {}
});
