//! Dependency graph in diamond shape. Writes one dot file per backprop step,
//! highlighting the node that just propagated.

use scalargrad::Tape;

fn main() {
    env_logger::init();

    let tape = Tape::new();
    let a = tape.term("a", 1.);
    let a2 = (-a).named("-a");
    let b = tape.term("b", 3.);
    let c = tape.term("c", 5.);
    let ab = (a2 + b).named("ab");
    let ac = (a2 + c).named("ac");
    let abac = (ab + ac).named("abac");

    let mut counter = 0;
    abac.backprop_cb(|term| {
        let mut file =
            std::io::BufWriter::new(std::fs::File::create(format!("dot{counter}.dot")).unwrap());
        abac.dot_builder().highlights(term).dot(&mut file).unwrap();
        counter += 1;
    });
    println!("abac: {}", abac.grad());
    println!("a: {}", a.grad());
    println!("b: {}", b.grad());
    println!("c: {}", c.grad());
}
