//! Compile a small program and execute its exported entry point.

fn main() {
    let source = r#"
        ; self-applicating factorial: no named recursion primitive,
        ; the function receives itself as its first argument
        ((function (f x) (f f x))
         (function (fact i)
           (if (le? i 1)
               1
               (mul i (fact fact (sub i 1)))))
         10)
    "#;

    let bytes = tern_core::compile_source(source).expect("compilation failed");
    println!("module: {} bytes", bytes.len());

    let result = tern_core::runner::run_main(&bytes).expect("execution failed");
    println!("=> {}", result);
}
