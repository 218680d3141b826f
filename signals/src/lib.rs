/*!
Thread-safe signals with any number of slots, each reporting through its own result handle.

A [`Signal`] holds an ordered list of slots. Invoking it calls every enabled slot with a copy of
the arguments, each as its own concurrently running unit of work, and returns a [`Dispatch`]: one
[`ResultHandle`] per slot, in subscription order.

# Design requirements:
- Slots never run while the signal is locked, so a slot may connect, disconnect or invoke its own signal
- A slot that panics only affects its own result handle
- Handles are plain tokens: using one after its slot is gone is harmless
- Asynchronous by default; synchronous signals return from `invoke` once every slot has finished

# Basic usage

```rust
use slot_signals::*;

let sum: Signal<(i32, i32), i32> = Signal::new();
sum.connect(|(i, j)| i + j);
sum.connect(|(i, j)| i * j);

let results: Vec<i32> = sum.invoke((3, 4)).wait_all().into_iter().map(Result::unwrap).collect();
assert_eq!(results, [7, 12]);
```

# Enabling and disabling

```rust
use slot_signals::*;

let on_click: Signal<()> = Signal::builder().asynchronous(false).build();
let slot = on_click.connect(|()| println!("clicked"));

assert!(!on_click.toggle_slot(slot)); // slot is off
assert!(on_click.invoke(()).is_empty());
assert!(on_click.toggle_slot(slot)); // and on again
assert_eq!(on_click.invoke(()).len(), 1);

on_click.toggle(); // the whole signal is off
assert!(on_click.invoke(()).is_empty());
```

# Bound methods

```rust
use slot_signals::*;

struct Message(String);
impl Message {
    fn median(&self, (i, j): (i32, i32)) -> i32 { (i + j) / 2 }
}

struct Button {
    sum: Signal<(i32, i32), i32>,
}

let button = Button { sum: Signal::new() };
button.sum.connect_bound(Message("M1".into()), Message::median);
assert_eq!(button.sum.invoke((10, 2))[0].wait().unwrap(), 6);
```
*/

mod error;
mod launcher;
mod result;
mod signal;
mod slot;

pub use error::*;
pub use launcher::*;
pub use result::*;
pub use signal::*;
pub use slot::*;
