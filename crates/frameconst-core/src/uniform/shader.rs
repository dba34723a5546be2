// Copyright 2025 eraflo
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

//! WGSL source for the uniform blocks, generated from the Rust layouts.

use super::blocks::{MatrixBlock, ParamsBlock, UniformBlock};
use std::fmt::Write;

/// Variable name of the matrix block in generated WGSL.
pub const MATRIX_BLOCK_VAR: &str = "frame_matrices";
/// Variable name of the params block in generated WGSL.
pub const PARAMS_BLOCK_VAR: &str = "frame_params";

fn write_block<T: UniformBlock>(out: &mut String, group: u32, var: &str) {
    let _ = writeln!(out, "struct {} {{", T::SHADER_NAME);
    for (name, ty) in T::FIELDS {
        let _ = writeln!(out, "    {name}: {ty},");
    }
    out.push_str("};\n");
    let _ = writeln!(
        out,
        "@group({group}) @binding({}) var<uniform> {var}: {};",
        T::KIND.binding(),
        T::SHADER_NAME
    );
}

/// Returns WGSL declarations of both uniform blocks in bind group `group`.
///
/// The matrix block is declared at binding 0 as `frame_matrices` and the params block
/// at binding 1 as `frame_params`. Prepend the result to a shader module to read the
/// per-frame constants.
///
/// ```
/// use frameconst_core::uniform::wgsl_declarations;
/// let wgsl = wgsl_declarations(0);
/// assert!(wgsl.contains("@group(0) @binding(0) var<uniform> frame_matrices: FrameMatrices;"));
/// assert!(wgsl.contains("@group(0) @binding(1) var<uniform> frame_params: FrameParams;"));
/// ```
pub fn wgsl_declarations(group: u32) -> String {
    let mut out = String::new();
    write_block::<MatrixBlock>(&mut out, group, MATRIX_BLOCK_VAR);
    out.push('\n');
    write_block::<ParamsBlock>(&mut out, group, PARAMS_BLOCK_VAR);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_every_field_once() {
        let wgsl = wgsl_declarations(2);
        for (name, ty) in MatrixBlock::FIELDS.iter().chain(ParamsBlock::FIELDS) {
            let line = format!("    {name}: {ty},");
            assert_eq!(wgsl.matches(&line).count(), 1, "{line}");
        }
        assert_eq!(wgsl.matches("@group(2)").count(), 2);
    }

    #[test]
    fn fields_follow_struct_order() {
        let wgsl = wgsl_declarations(0);
        let view = wgsl.find("screen_view:").unwrap();
        let shadow = wgsl.find("shadow_view_proj:").unwrap();
        let time = wgsl.find("time_info:").unwrap();
        let random = wgsl.find("random:").unwrap();
        assert!(view < shadow && shadow < time && time < random);
    }
}
