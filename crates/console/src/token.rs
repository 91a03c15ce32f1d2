// SocDiag - SoC Bring-up Diagnostic Console
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Split off the text before the first space and advance `rest` past it.
///
/// Without a space the whole input is the token and `rest` becomes empty.
pub fn next_token<'a>(rest: &mut &'a [u8]) -> &'a [u8] {
    let line = *rest;
    match line.iter().position(|&b| b == b' ') {
        Some(split) => {
            *rest = &line[split + 1..];
            &line[..split]
        }
        None => {
            *rest = &line[line.len()..];
            line
        }
    }
}
