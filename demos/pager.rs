use pager::{Allocator, BackingStore, PagerError};

/// Prints the geometry and the page map of an allocator, four pages per line
/// behind the hex value of their page map byte.
fn print_allocator<S: BackingStore>(
  label: &str,
  allocator: &Allocator<S>,
) {
  println!("[{}] {:?} mode", label, allocator.mode());
  println!("page_number:   {}", allocator.page_number());
  println!("used_number:   {}", allocator.used_number());
  println!("mem_bank_size: {}", allocator.mem_bank_size());
  println!("page_map_size: {}", allocator.page_map_size());
  println!("Page Map:\n{:#}\n", allocator.page_map());
}

fn main() -> Result<(), PagerError> {
  env_logger::init();

  // --------------------------------------------------------------------
  // 1) Fixed: 513 bytes hold exactly one 512-byte page and its map byte.
  // --------------------------------------------------------------------
  const BUFFER_SIZE: usize = 513;
  let mut buffer = [0u8; BUFFER_SIZE];

  let mut fixed = Allocator::init_fixed(&mut buffer)?;
  print_allocator("fixed", &fixed);

  let block = fixed.allocate(200)?;
  print_allocator("fixed, one block", &fixed);

  // The only page is taken and a fixed arena cannot grow.
  match fixed.allocate(1) {
    Err(error) => println!("second allocation refused: {}\n", error),
    Ok(_) => unreachable!("a one-page arena has room for one block"),
  }

  fixed.free(block)?;
  let buffer = fixed.shutdown();
  println!("buffer handed back: {} bytes at {:?}\n", buffer.len(), buffer.as_ptr());

  // --------------------------------------------------------------------
  // 2) Dynamic: starts at eight pages and doubles when a request misses.
  // --------------------------------------------------------------------
  let mut dynamic = Allocator::init_default()?;
  print_allocator("dynamic", &dynamic);

  let small = dynamic.allocate(100)?;
  let large = dynamic.allocate(5 * 512)?;
  dynamic.bytes_mut(small)?.fill(0xAB);
  print_allocator("dynamic, two blocks", &dynamic);

  // Does not fit in the remaining two pages: one growth step.
  let huge = dynamic.allocate(6 * 512)?;
  print_allocator("dynamic, grown", &dynamic);

  // Blocks are page indices, so they survive the move of the arena.
  println!(
    "small block still holds 0x{:X} at {:?}\n",
    dynamic.bytes(small)?[0],
    dynamic.ptr(small)?
  );

  for block in [small, large, huge] {
    dynamic.free(block)?;
  }
  print_allocator("dynamic, all freed", &dynamic);

  dynamic.shutdown();

  Ok(())
}
