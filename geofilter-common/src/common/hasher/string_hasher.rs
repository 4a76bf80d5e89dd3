// Copyright 2025 The GeoFilter Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Unit separator written between parts so that `["ab", "c"]` and `["a", "bc"]` differ.
const PART_SEPARATOR: u8 = 0x1f;

/// 64-bit FNV-1a over strings, stable across processes and platforms.
pub struct ContentHasher;

impl ContentHasher {
    pub fn hash_str(s: &str) -> u64 {
        Self::feed(FNV_OFFSET_BASIS, s.as_bytes())
    }

    pub fn hash_parts<'a, I>(parts: I) -> u64
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut state = FNV_OFFSET_BASIS;
        for (index, part) in parts.into_iter().enumerate() {
            if index > 0 {
                state = Self::feed(state, &[PART_SEPARATOR]);
            }
            state = Self::feed(state, part.as_bytes());
        }
        state
    }

    #[inline]
    fn feed(mut state: u64, bytes: &[u8]) -> u64 {
        for byte in bytes {
            state ^= u64::from(*byte);
            state = state.wrapping_mul(FNV_PRIME);
        }
        state
    }
}
