use thumbpress::layout::{self, line_text};
use thumbpress::{FontFace, Size};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // load a font to measure with
    let font = include_bytes!("../assets/DejaVuSans.ttf");
    let font = FontFace::load(font.to_vec()).expect("can load font");

    let text = "What Goes Up Must Come Down";
    let box_size = Size::new(3800, 3800);

    let fitted = layout::fit(text, box_size, 1000, |size| font.at_size(size))
        .expect("text fits at some size");
    println!("settled on {}px after {} tries", fitted.size, fitted.tries);
    for line in fitted.lines.iter() {
        println!("  {}", line_text(line));
    }

    // a box too short for the paragraph truncates instead of failing
    let paragraph = lipsum::lipsum(80);
    let lines = layout::wrap(&paragraph, &font.at_size(32), Size::new(600, 120), false)
        .expect("non-strict wrapping does not fail");
    for line in lines.iter() {
        println!("  {}", line_text(line));
    }
}
