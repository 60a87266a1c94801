use std::cmp::Ordering;

/// Compare two strings treating digit runs as numbers, so "file2" sorts
/// before "file10". Ties on numerically-equal runs ("01" vs "1") fall back
/// to plain string order for determinism.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    match natural_cmp_runs(a, b) {
        Ordering::Equal => a.cmp(b),
        ord => ord,
    }
}

fn natural_cmp_runs(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ac), Some(bc)) => {
                if ac.is_ascii_digit() && bc.is_ascii_digit() {
                    let run_a = take_digit_run(&mut a);
                    let run_b = take_digit_run(&mut b);
                    match cmp_digit_runs(&run_a, &run_b) {
                        Ordering::Equal => {}
                        ord => return ord,
                    }
                } else {
                    match ac.cmp(&bc) {
                        Ordering::Equal => {
                            a.next();
                            b.next();
                        }
                        ord => return ord,
                    }
                }
            }
        }
    }
}

fn take_digit_run(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut run = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

/// Compare digit runs by numeric value without parsing into an integer, so
/// arbitrarily long runs cannot overflow.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
