// Property-based tests harness
mod strategies;
mod ranges {
    include!("ranges.rs");
}
mod layout {
    include!("layout.rs");
}
mod dispatch {
    include!("dispatch.rs");
}
