/// Font merge binary entry point
///
/// Fills every codepoint a font lacks with the glyph of a second font.
///
/// # Examples
///
/// ```sh
/// cargo run --bin merge_fonts -- Inter.ttf CafeKr.ttf merged/Inter-Kr.ttf
/// ```
///
/// With verbosity control:
/// ```sh
/// cargo run --bin merge_fonts -- -vv Inter.ttf CafeKr.ttf
/// ```
use font_range_tool::cli::main_for;
use font_range_tool::range::OperationMode;

fn main() {
    main_for(OperationMode::FullMerge)
}
