pub mod cpu_add;
