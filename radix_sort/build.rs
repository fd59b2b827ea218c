fn main() {
    #[cfg(feature = "cuda")]
    cuda_builder::CudaBuilder::new("../radix_sort_gpu")
        .copy_to("../resources/radix_sort_gpu.ptx")
        .build()
        .unwrap();
}
