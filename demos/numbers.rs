//! Reads the number words one..ten into their integer forms, then shows the
//! integer and float presets on top of the same engine.

use tablewalk::{presets, StateMachine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut numbers: StateMachine<i32> = StateMachine::new();
    numbers.match_sequence(b"one").commit(1)?;
    numbers.match_sequence(b"two").commit(2)?;
    numbers.match_sequence(b"three").commit(3)?;
    numbers.match_sequence(b"four").commit(4)?;
    numbers.match_sequence(b"five").commit(5)?;
    numbers.match_sequence(b"six").commit(6)?;
    numbers.match_sequence(b"seven").commit(7)?;
    numbers.match_sequence(b"eight").commit(8)?;
    numbers.match_sequence(b"nine").commit(9)?;
    numbers.match_sequence(b"ten").commit(10)?;
    numbers.optimize();

    for word in ["three", "ten", "eleven"] {
        match numbers.full_match(word.as_bytes()) {
            Some(n) => println!("{word} -> {n}"),
            None => println!("{word} -> no match"),
        }
    }

    let integer = presets::integer();
    println!("\ninteger machine:");
    integer.print_dbg();

    let float = presets::float();
    let text = b"pi is 3.14159 and e is 2.71828";
    for span in float.find_all(text) {
        println!(
            "float at {}..{}: {}",
            span.start,
            span.end,
            String::from_utf8_lossy(&text[span.start..span.end])
        );
    }
    Ok(())
}
