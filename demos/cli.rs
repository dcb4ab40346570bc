use std::io::{BufRead, BufReader};
use zeroform::SystemOfEquations;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut system = SystemOfEquations::new();
    let stdin = std::io::stdin();

    for line in BufReader::new(stdin.lock()).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse() {
            Ok(equation) => system.push(equation),
            Err(e) => eprintln!("Unable to parse \"{}\": {}", line, e),
        }
    }

    let unknowns: Vec<_> =
        system.unknowns().iter().map(ToString::to_string).collect();
    println!("Unknowns: {}", unknowns.join(", "));

    let jacobian = system.jacobian()?;

    println!("Jacobian:");
    println!("{}", jacobian.matrix());

    println!("Inverse:");
    println!("{}", jacobian.inverted()?);

    Ok(())
}
