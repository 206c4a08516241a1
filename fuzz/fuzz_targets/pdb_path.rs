#![no_main]
use libfuzzer_sys::fuzz_target;
use pecoff_pdb::{pdb_path, ParseOptions};

fuzz_target!(|data: &[u8]| {
    if let Ok(path) = pdb_path(data, &ParseOptions::default()) {
        let range = data.as_ptr_range();
        assert!(range.contains(&path.as_ptr()));
        assert!(range.end as usize - path.as_ptr() as usize >= path.len());
        assert_eq!(path.as_bytes_with_nul().last(), Some(&0));
    }
});
