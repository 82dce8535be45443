use crate::host::{DocumentSymbol, TextPosition};

/// Outermost declaration whose range contains `position`. Non-declaration
/// containers such as modules are looked through, never returned.
pub fn outermost_enclosing(
    symbols: &[DocumentSymbol],
    position: TextPosition,
) -> Option<&DocumentSymbol> {
    for symbol in symbols {
        if !symbol.range.contains(position) {
            continue;
        }
        if symbol.kind.is_declaration() {
            return Some(symbol);
        }
        if let Some(found) = outermost_enclosing(&symbol.children, position) {
            return Some(found);
        }
    }
    None
}
