/// Private Use Area copy binary entry point
///
/// Replaces the U+E000..=U+E099 block of a font with the glyphs of another.
///
/// # Examples
///
/// ```sh
/// cargo run --bin copy_pua -- Inter.ttf CafeStd.ttf
/// ```
///
/// writes `Inter+CafeStd(PUA).ttf` to the current directory.
use font_range_tool::cli::main_for;
use font_range_tool::range::OperationMode;

fn main() {
    main_for(OperationMode::RangeCopy)
}
